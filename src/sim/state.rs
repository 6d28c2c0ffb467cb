//! Game state and core simulation types
//!
//! Everything the tick mutates lives here. Entities share one ID-ordered
//! arena and are told apart by a closed `EntityKind` enum.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::difficulty::{DifficultyTier, PerformanceSnapshot, local_tier};

/// Current phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Created but not started
    Ready,
    /// Active gameplay
    Playing,
    /// Session is paused (no ticks advance)
    Paused,
    /// Run ended (stopped or out of mistakes)
    GameOver,
}

/// Obstacle catalog (uniform spawn choice)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    Train,
    Barrier,
    Truck,
    Cone,
    Car,
    Beam,
}

impl ObstacleKind {
    pub const ALL: [ObstacleKind; 6] = [
        Self::Train,
        Self::Barrier,
        Self::Truck,
        Self::Cone,
        Self::Car,
        Self::Beam,
    ];
}

/// Coin rarity, driven by the combo at spawn time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CoinTier {
    #[default]
    Normal,
    Golden,
    Diamond,
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUpKind {
    /// Absorbs the next obstacle hit
    Shield,
    /// Pulls nearby coins into the runner's lane
    Magnet,
    /// Flat score bonus
    ScoreBonus,
    /// Timed immunity to obstacle hits
    Invincibility,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 4] = [
        Self::Shield,
        Self::Magnet,
        Self::ScoreBonus,
        Self::Invincibility,
    ];
}

/// What an entity is
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    Obstacle(ObstacleKind),
    Coin { value: u32, tier: CoinTier },
    PowerUp(PowerUpKind),
}

/// A scrolling entity on the track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: u32,
    pub lane: u8,
    /// Vertical position; grows every tick until the entity leaves the track
    pub y: f32,
    pub kind: EntityKind,
}

impl Entity {
    pub fn is_obstacle(&self) -> bool {
        matches!(self.kind, EntityKind::Obstacle(_))
    }

    pub fn is_coin(&self) -> bool {
        matches!(self.kind, EntityKind::Coin { .. })
    }

    pub fn is_power_up(&self) -> bool {
        matches!(self.kind, EntityKind::PowerUp(_))
    }
}

/// The player's runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runner {
    /// Current lane (0..LANE_COUNT)
    pub lane: u8,
    pub jump_height: f32,
    pub jump_velocity: f32,
    pub is_jumping: bool,
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            lane: START_LANE,
            jump_height: 0.0,
            jump_velocity: 0.0,
            is_jumping: false,
        }
    }
}

impl Runner {
    /// Step one lane left/right; false if already at the boundary
    pub fn shift_lane(&mut self, delta: i8) -> bool {
        let target = self.lane as i16 + delta as i16;
        if target < 0 || target >= LANE_COUNT as i16 {
            return false;
        }
        self.lane = target as u8;
        true
    }

    pub fn is_airborne(&self) -> bool {
        self.is_jumping || self.jump_height > 0.0
    }

    /// Begin a jump; ignored while airborne
    pub fn start_jump(&mut self) -> bool {
        if self.is_airborne() {
            return false;
        }
        self.is_jumping = true;
        self.jump_velocity = JUMP_POWER;
        self.jump_height = JUMP_START_HEIGHT;
        true
    }

    /// Advance jump physics one tick. Returns true on the landing tick.
    pub fn step_jump(&mut self) -> bool {
        if !self.is_airborne() {
            return false;
        }
        self.jump_velocity -= GRAVITY;
        self.jump_height += self.jump_velocity;
        if self.jump_height <= 0.0 {
            self.jump_height = 0.0;
            self.jump_velocity = 0.0;
            self.is_jumping = false;
            return true;
        }
        false
    }

    /// Whether the runner is high enough to pass over obstacles
    pub fn clears_obstacles(&self) -> bool {
        self.jump_height >= JUMP_CLEARANCE
    }
}

/// Timed and one-shot status effects ("active-until" simulated timestamps)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActiveEffects {
    pub invulnerable_until_ms: u64,
    pub shield_active: bool,
    pub magnet_until_ms: u64,
}

impl ActiveEffects {
    pub fn is_invulnerable(&self, now_ms: u64) -> bool {
        now_ms < self.invulnerable_until_ms
    }

    pub fn magnet_active(&self, now_ms: u64) -> bool {
        now_ms < self.magnet_until_ms
    }

    /// Extend invulnerability to at least `now_ms + duration_ms`
    pub fn grant_invulnerability(&mut self, now_ms: u64, duration_ms: u64) {
        self.invulnerable_until_ms = self.invulnerable_until_ms.max(now_ms + duration_ms);
    }
}

/// Things that happened during a tick, drained by the session
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum GameEvent {
    Landed,
    ShieldAbsorbed,
    /// Hit taken while invulnerable; nothing counted
    HitIgnored,
    Mistake { mistakes: u8 },
    CoinCollected { points: u64, combo: u32 },
    PowerUpCollected(PowerUpKind),
    TierChanged { from: DifficultyTier, to: DifficultyTier },
    GameOver,
}

/// Complete game state (deterministic for a given seed and input sequence)
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    /// Spawn RNG
    pub rng: Pcg32,
    pub phase: GamePhase,
    pub score: u64,
    pub distance: f32,
    pub speed: f32,
    /// Effective tier driving the speed curve
    pub tier: DifficultyTier,
    /// Last tier returned by the difficulty service, if any
    pub remote_tier: Option<DifficultyTier>,
    pub runner: Runner,
    pub mistakes: u8,
    pub combo: u32,
    pub max_combo: u32,
    pub effects: ActiveEffects,
    /// Obstacles, coins and power-ups (sorted by id)
    pub entities: Vec<Entity>,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Simulated milliseconds elapsed
    pub time_ms: u64,
    /// Delta between the last two accepted lane changes (telemetry only)
    pub reaction_time_ms: Option<u64>,
    /// Wall-clock ms of the last accepted lane change
    pub last_move_at_ms: u64,
    /// Events produced since the last drain
    pub events: Vec<GameEvent>,
    /// Next entity ID
    next_id: u32,
}

impl GameState {
    /// Create a new game state with the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            phase: GamePhase::Ready,
            score: 0,
            distance: 0.0,
            speed: 1.0,
            tier: DifficultyTier::Easy,
            remote_tier: None,
            runner: Runner::default(),
            mistakes: 0,
            combo: 0,
            max_combo: 0,
            effects: ActiveEffects::default(),
            entities: Vec::new(),
            time_ticks: 0,
            time_ms: 0,
            reaction_time_ms: None,
            last_move_at_ms: 0,
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Add an entity at the top of the track
    pub fn spawn(&mut self, lane: u8, y: f32, kind: EntityKind) -> u32 {
        let id = self.next_entity_id();
        self.entities.push(Entity { id, lane, y, kind });
        id
    }

    pub fn remove_entity(&mut self, id: u32) {
        self.entities.retain(|e| e.id != id);
    }

    pub fn obstacles(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| e.is_obstacle())
    }

    pub fn coins(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| e.is_coin())
    }

    pub fn power_ups(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| e.is_power_up())
    }

    /// Ensure entities are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.entities.sort_by_key(|e| e.id);
    }

    /// Playing or paused (a session is in progress)
    pub fn is_active(&self) -> bool {
        matches!(self.phase, GamePhase::Playing | GamePhase::Paused)
    }

    pub fn is_paused(&self) -> bool {
        self.phase == GamePhase::Paused
    }

    pub fn is_invulnerable(&self) -> bool {
        self.effects.is_invulnerable(self.time_ms)
    }

    pub fn magnet_active(&self) -> bool {
        self.effects.magnet_active(self.time_ms)
    }

    /// Toggle pause. Returns false when no session is in progress.
    pub fn toggle_pause(&mut self) -> bool {
        match self.phase {
            GamePhase::Playing => self.phase = GamePhase::Paused,
            GamePhase::Paused => self.phase = GamePhase::Playing,
            _ => return false,
        }
        true
    }

    /// Adopt a tier returned by the difficulty service
    pub fn apply_remote_tier(&mut self, tier: DifficultyTier) {
        self.remote_tier = Some(tier);
        self.refresh_tier();
    }

    /// Forget the remote tier and fall back to the score-based one
    pub fn clear_remote_tier(&mut self) {
        self.remote_tier = None;
        self.refresh_tier();
    }

    /// Recompute the effective tier, recording a change event
    pub fn refresh_tier(&mut self) {
        let next = self.remote_tier.unwrap_or_else(|| local_tier(self.score));
        if next != self.tier {
            log::info!("Difficulty {} -> {}", self.tier, next);
            self.events.push(GameEvent::TierChanged {
                from: self.tier,
                to: next,
            });
            self.tier = next;
        }
    }

    /// Performance snapshot for the difficulty exchange
    pub fn snapshot(&self) -> PerformanceSnapshot {
        PerformanceSnapshot {
            score: self.score as f64,
            reaction_time_ms: self.reaction_time_ms.unwrap_or(DEFAULT_REACTION_MS) as f64,
            mistakes: self.mistakes as f64,
            speed: self.speed as f64,
            distance: self.distance.floor() as f64,
            combo: self.combo as f64,
        }
    }

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_lane_bounds() {
        let mut runner = Runner::default();
        assert_eq!(runner.lane, 1);
        assert!(runner.shift_lane(-1));
        assert_eq!(runner.lane, 0);
        assert!(!runner.shift_lane(-1));
        assert_eq!(runner.lane, 0);
        assert!(runner.shift_lane(1));
        assert!(runner.shift_lane(1));
        assert!(!runner.shift_lane(1));
        assert_eq!(runner.lane, 2);
    }

    #[test]
    fn test_jump_arc_lands_cleanly() {
        let mut runner = Runner::default();
        assert!(runner.start_jump());
        assert!(!runner.start_jump(), "no double jump");

        let mut ticks = 0;
        let mut peak: f32 = 0.0;
        while !runner.step_jump() {
            peak = peak.max(runner.jump_height);
            ticks += 1;
            assert!(ticks < 200, "jump never landed");
        }
        assert!(peak > JUMP_CLEARANCE);
        assert_eq!(runner.jump_height, 0.0);
        assert_eq!(runner.jump_velocity, 0.0);
        assert!(!runner.is_jumping);
        assert!(runner.start_jump(), "can jump again after landing");
    }

    #[test]
    fn test_effect_windows_are_exclusive() {
        let mut effects = ActiveEffects::default();
        effects.grant_invulnerability(1_000, 2_000);
        assert!(effects.is_invulnerable(1_000));
        assert!(effects.is_invulnerable(2_999));
        assert!(!effects.is_invulnerable(3_000));

        // Shorter grant never shortens an existing window
        effects.grant_invulnerability(1_500, 100);
        assert_eq!(effects.invulnerable_until_ms, 3_000);
    }

    #[test]
    fn test_toggle_pause_requires_active_session() {
        let mut state = GameState::new(1);
        assert!(!state.toggle_pause());
        state.phase = GamePhase::Playing;
        assert!(state.toggle_pause());
        assert!(state.is_paused());
        assert!(state.toggle_pause());
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_remote_tier_overrides_local() {
        let mut state = GameState::new(1);
        state.score = 60;
        state.refresh_tier();
        assert_eq!(state.tier, DifficultyTier::Medium);

        state.apply_remote_tier(DifficultyTier::Easy);
        assert_eq!(state.tier, DifficultyTier::Easy);

        state.clear_remote_tier();
        assert_eq!(state.tier, DifficultyTier::Medium);
        assert_eq!(
            state
                .drain_events()
                .iter()
                .filter(|e| matches!(e, GameEvent::TierChanged { .. }))
                .count(),
            3
        );
    }

    #[test]
    fn test_snapshot_defaults_reaction_time() {
        let mut state = GameState::new(1);
        state.score = 42;
        state.distance = 12.7;
        let snap = state.snapshot();
        assert_eq!(snap.score, 42.0);
        assert_eq!(snap.reaction_time_ms, DEFAULT_REACTION_MS as f64);
        assert_eq!(snap.distance, 12.0);

        state.reaction_time_ms = Some(350);
        assert_eq!(state.snapshot().reaction_time_ms, 350.0);
    }
}
