//! Combat tick benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ninja_arena::game::{tick, AbilityRequest, ArenaMap, CombatConfig, RemoteSnapshot, World};
use ninja_arena::{PlayerId, Vec2, FRAME_MS};

fn crowded_world(remotes: usize) -> World {
    let mut world = World::new(PlayerId::new(), "bench", "#ff0000", CombatConfig::default(), ArenaMap::standard());
    for i in 0..remotes {
        let x = 60.0 + (i % 10) as f32 * 70.0;
        let y = 60.0 + (i / 10) as f32 * 70.0;
        world.upsert_remote(PlayerId::new(), RemoteSnapshot {
            name: format!("p{}", i),
            color: "#00ff00".to_string(),
            position: Vec2::new(x, y),
            alive: true,
        });
    }
    world
}

fn bench_idle_tick(c: &mut Criterion) {
    let mut world = crowded_world(16);
    c.bench_function("tick_16_players_idle", |b| {
        b.iter(|| tick(black_box(&mut world), FRAME_MS))
    });
}

fn bench_combat_tick(c: &mut Criterion) {
    c.bench_function("tick_shockwave_and_daggers", |b| {
        b.iter_batched(
            || {
                let mut world = crowded_world(16);
                let me = world.local_id();
                let throwers: Vec<PlayerId> = world.remotes().map(|p| p.id).collect();
                let _ = world.launch_shockwave(700.0, 100.0);
                for thrower in throwers {
                    let _ = world.trigger(thrower, AbilityRequest::Dagger { target_id: me, origin: None });
                }
                world.move_to(400.0, 500.0);
                world
            },
            |mut world| {
                for _ in 0..30 {
                    black_box(tick(&mut world, FRAME_MS));
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_idle_tick, bench_combat_tick);
criterion_main!(benches);
