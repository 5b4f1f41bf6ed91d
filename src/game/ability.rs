//! Ability State Machines
//!
//! Deflect, Blink, Shockwave and Dagger. Each trigger either succeeds and
//! returns an [`AbilityUse`] describing what happened, or is rejected with
//! an [`AbilityError`] and leaves every piece of state untouched.
//!
//! ```text
//!            trigger (alive, cooldown idle, not active)
//!   ARMED ─────────────────────────────────────────────► COOLING DOWN
//!     ▲                                                     │
//!     └─────────────────── cooldown elapsed ────────────────┘
//!
//!   Deflect additionally runs a shorter ACTIVE window from the same
//!   instant; invulnerability ends with it, the cooldown keeps running.
//! ```

use serde::{Serialize, Deserialize};

use crate::core::timer::{Millis, Timer};
use crate::core::vec2::Vec2;
use crate::game::collision::circle_hits_any_wall;
use crate::game::config::CombatConfig;
use crate::game::map::Wall;
use crate::game::player::{PlayerEntity, PlayerId};
use crate::game::projectile::{Beam, Dagger};

// =============================================================================
// ABILITY KINDS
// =============================================================================

/// The four abilities every player carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityKind {
    /// Short invulnerability window.
    Deflect,
    /// Instant range-limited teleport.
    Blink,
    /// Travelling line beam.
    Shockwave,
    /// Homing projectile.
    Dagger,
}

impl AbilityKind {
    /// All kinds, in slot order.
    pub const ALL: [AbilityKind; 4] = [
        AbilityKind::Deflect,
        AbilityKind::Blink,
        AbilityKind::Shockwave,
        AbilityKind::Dagger,
    ];

    #[inline]
    fn slot(self) -> usize {
        self as usize
    }

    /// Cooldown for this kind.
    pub fn cooldown_ms(self, config: &CombatConfig) -> Millis {
        match self {
            AbilityKind::Deflect => config.deflect_cooldown_ms,
            AbilityKind::Blink => config.blink_cooldown_ms,
            AbilityKind::Shockwave => config.shockwave_cooldown_ms,
            AbilityKind::Dagger => config.dagger_cooldown_ms,
        }
    }
}

// =============================================================================
// ERRORS & FEEDBACK
// =============================================================================

/// Why a trigger was rejected. Rejections never change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum AbilityError {
    /// The caster is dead.
    #[error("player is dead")]
    Dead,

    /// The cooldown window is still running.
    #[error("ability is on cooldown")]
    OnCooldown,

    /// Deflect is already in effect.
    #[error("ability is already active")]
    AlreadyActive,

    /// Dagger has no living target.
    #[error("no valid target")]
    NoTarget,

    /// Blink destination overlaps a wall.
    #[error("destination is blocked")]
    BlockedDestination,

    /// The caster is not known to this client.
    #[error("unknown player")]
    UnknownPlayer,
}

/// Local feedback cue for a rejected trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    /// "Not ready yet" cue.
    Cooldown,
    /// "Can't do that" cue.
    Error,
}

impl AbilityError {
    /// Cue to surface for this rejection.
    pub fn feedback(self) -> Feedback {
        match self {
            AbilityError::Dead | AbilityError::OnCooldown | AbilityError::AlreadyActive => {
                Feedback::Cooldown
            }
            AbilityError::NoTarget
            | AbilityError::BlockedDestination
            | AbilityError::UnknownPlayer => Feedback::Error,
        }
    }
}

// =============================================================================
// REQUESTS & OUTCOMES
// =============================================================================

/// A trigger request, from local input or a relayed remote trigger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AbilityRequest {
    /// Activate Deflect.
    Deflect,
    /// Blink toward a point.
    Blink {
        /// Requested destination (clamped to range).
        destination: Vec2,
    },
    /// Fire a Shockwave toward a point.
    Shockwave {
        /// Aim point.
        target: Vec2,
    },
    /// Throw a Dagger at a player.
    Dagger {
        /// Player to pursue.
        target_id: PlayerId,
        /// Launch point override (remote replays).
        origin: Option<Vec2>,
    },
}

impl AbilityRequest {
    /// Which ability this request triggers.
    pub fn kind(&self) -> AbilityKind {
        match self {
            AbilityRequest::Deflect => AbilityKind::Deflect,
            AbilityRequest::Blink { .. } => AbilityKind::Blink,
            AbilityRequest::Shockwave { .. } => AbilityKind::Shockwave,
            AbilityRequest::Dagger { .. } => AbilityKind::Dagger,
        }
    }
}

/// Description of a successful trigger, suitable for relaying.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AbilityUse {
    /// Deflect started.
    Deflect,
    /// Teleported to `destination` (already range-clamped).
    Blink {
        /// Realized destination.
        destination: Vec2,
    },
    /// Beam fired toward `target`.
    Shockwave {
        /// Aim point.
        target: Vec2,
    },
    /// Dagger launched from `origin` at `target_id`.
    Dagger {
        /// Pursued player.
        target_id: PlayerId,
        /// Launch point.
        origin: Vec2,
    },
}

impl AbilityUse {
    /// Which ability was used.
    pub fn kind(&self) -> AbilityKind {
        match self {
            AbilityUse::Deflect => AbilityKind::Deflect,
            AbilityUse::Blink { .. } => AbilityKind::Blink,
            AbilityUse::Shockwave { .. } => AbilityKind::Shockwave,
            AbilityUse::Dagger { .. } => AbilityKind::Dagger,
        }
    }
}

// =============================================================================
// PER-ABILITY STATE
// =============================================================================

/// Timer expiries observed by one [`AbilityState::poll`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbilityTransitions {
    /// The effect window (Deflect) closed this poll.
    pub effect_ended: bool,
    /// The cooldown closed this poll; the ability is armed again.
    pub ready: bool,
}

/// Timers for one ability of one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbilityState {
    /// Which ability this is.
    pub kind: AbilityKind,
    cooldown: Timer,
    effect: Timer,
}

impl AbilityState {
    /// Fresh, armed state.
    pub const fn new(kind: AbilityKind) -> Self {
        Self {
            kind,
            cooldown: Timer::new(),
            effect: Timer::new(),
        }
    }

    /// Effect window currently running (Deflect only).
    #[inline]
    pub fn is_active(&self, now: Millis) -> bool {
        self.effect.is_running(now)
    }

    /// Cooldown window currently running.
    #[inline]
    pub fn is_cooling_down(&self, now: Millis) -> bool {
        self.cooldown.is_running(now)
    }

    /// Ready to trigger: no cooldown and not active.
    #[inline]
    pub fn is_armed(&self, now: Millis) -> bool {
        !self.is_cooling_down(now) && !self.is_active(now)
    }

    /// Milliseconds until the cooldown elapses.
    pub fn cooldown_remaining(&self, now: Millis) -> Millis {
        self.cooldown.remaining(now)
    }

    /// When the running cooldown started, for progress bars.
    pub fn cooldown_started_at(&self) -> Option<Millis> {
        self.cooldown.started_at()
    }

    /// Cooldown bar fill, `0.0..=1.0`.
    pub fn cooldown_progress(&self, now: Millis) -> f32 {
        self.cooldown.progress(now)
    }

    /// Start the cooldown (and optionally a concurrent effect window).
    fn commit(&mut self, now: Millis, cooldown_ms: Millis, effect_ms: Option<Millis>) {
        self.cooldown.arm(now, cooldown_ms);
        if let Some(duration) = effect_ms {
            self.effect.arm(now, duration);
        }
    }

    /// Clear elapsed timers and report what changed.
    pub fn poll(&mut self, now: Millis) -> AbilityTransitions {
        AbilityTransitions {
            effect_ended: self.effect.poll(now),
            ready: self.cooldown.poll(now),
        }
    }
}

/// The four ability states of one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbilitySet {
    states: [AbilityState; 4],
}

impl AbilitySet {
    /// All abilities armed.
    pub fn new() -> Self {
        Self {
            states: AbilityKind::ALL.map(AbilityState::new),
        }
    }

    /// State for one ability.
    pub fn get(&self, kind: AbilityKind) -> &AbilityState {
        &self.states[kind.slot()]
    }

    fn get_mut(&mut self, kind: AbilityKind) -> &mut AbilityState {
        &mut self.states[kind.slot()]
    }

    /// Iterate in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &AbilityState> {
        self.states.iter()
    }

    /// Poll every ability's timers.
    pub fn poll(&mut self, now: Millis) -> Vec<(AbilityKind, AbilityTransitions)> {
        self.states
            .iter_mut()
            .map(|state| (state.kind, state.poll(now)))
            .filter(|(_, t)| t.effect_ended || t.ready)
            .collect()
    }
}

impl Default for AbilitySet {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TRIGGERS
// =============================================================================

/// Shared guard: alive, not active, not cooling down.
fn check_ready(player: &PlayerEntity, kind: AbilityKind, now: Millis) -> Result<(), AbilityError> {
    if !player.is_alive() {
        return Err(AbilityError::Dead);
    }
    let state = player.abilities().get(kind);
    if state.is_active(now) {
        return Err(AbilityError::AlreadyActive);
    }
    if state.is_cooling_down(now) {
        return Err(AbilityError::OnCooldown);
    }
    Ok(())
}

/// Deflect: invulnerable for the duration window, cooldown runs alongside.
pub fn activate_deflect(
    player: &mut PlayerEntity,
    now: Millis,
    config: &CombatConfig,
) -> Result<AbilityUse, AbilityError> {
    check_ready(player, AbilityKind::Deflect, now)?;

    player.abilities_mut().get_mut(AbilityKind::Deflect).commit(
        now,
        config.deflect_cooldown_ms,
        Some(config.deflect_duration_ms),
    );
    Ok(AbilityUse::Deflect)
}

/// Blink: teleport toward `destination`, at most `range` away.
///
/// A destination overlapping any wall aborts without starting the
/// cooldown.
pub fn try_blink(
    player: &mut PlayerEntity,
    destination: Vec2,
    walls: &[Wall],
    range: f32,
    now: Millis,
    config: &CombatConfig,
) -> Result<AbilityUse, AbilityError> {
    check_ready(player, AbilityKind::Blink, now)?;

    let landing = destination.clamp_distance_from(player.position, range);
    if circle_hits_any_wall(landing, player.radius, walls) {
        return Err(AbilityError::BlockedDestination);
    }

    player.teleport(landing);
    player
        .abilities_mut()
        .get_mut(AbilityKind::Blink)
        .commit(now, config.blink_cooldown_ms, None);
    Ok(AbilityUse::Blink { destination: landing })
}

/// Shockwave: spawn a beam from the caster aimed at `target`.
///
/// The returned beam belongs in the scene-level beam list.
pub fn launch_shockwave(
    player: &mut PlayerEntity,
    target: Vec2,
    now: Millis,
    config: &CombatConfig,
) -> Result<(AbilityUse, Beam), AbilityError> {
    check_ready(player, AbilityKind::Shockwave, now)?;

    let beam = Beam::new(player.id, player.position, target, now, config);
    player
        .abilities_mut()
        .get_mut(AbilityKind::Shockwave)
        .commit(now, config.shockwave_cooldown_ms, None);
    Ok((AbilityUse::Shockwave { target }, beam))
}

/// What a dagger needs to know about its target at launch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetInfo {
    /// Target id.
    pub id: PlayerId,
    /// Current position.
    pub position: Vec2,
    /// Whether it is alive.
    pub alive: bool,
}

/// Dagger: launch a homing projectile at a living target.
///
/// `origin` overrides the launch point (used when replaying a relayed
/// trigger, so the dagger starts where the remote caster was).
pub fn launch_dagger(
    player: &mut PlayerEntity,
    target: Option<TargetInfo>,
    origin: Option<Vec2>,
    now: Millis,
    config: &CombatConfig,
) -> Result<AbilityUse, AbilityError> {
    check_ready(player, AbilityKind::Dagger, now)?;

    let target = match target {
        Some(t) if t.alive && t.id != player.id => t,
        _ => return Err(AbilityError::NoTarget),
    };

    let origin = origin.unwrap_or(player.position);
    player.daggers.push(Dagger::new(origin, target.id, target.position, now, config));
    player
        .abilities_mut()
        .get_mut(AbilityKind::Dagger)
        .commit(now, config.dagger_cooldown_ms, None);
    Ok(AbilityUse::Dagger { target_id: target.id, origin })
}
