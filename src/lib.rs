//! Lane Dash - A three-lane endless runner
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, spawning, collisions, scoring)
//! - `difficulty`: Rule-based difficulty engine and tier settings
//! - `feedback`: Periodic difficulty exchange with the rule-engine service
//! - `session`: Session driver (fixed timestep, input buffering, finalization)
//! - `stats`: Session summaries and the stats repository collaborator
//! - `server`: HTTP difficulty service

pub mod difficulty;
pub mod feedback;
pub mod highscores;
pub mod server;
pub mod session;
pub mod settings;
pub mod sim;
pub mod stats;

pub use difficulty::{DifficultySettings, DifficultyTier, PerformanceSnapshot};
pub use highscores::HighScores;
pub use session::{Session, SessionStatus};
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep in milliseconds (~60 Hz)
    pub const TICK_MS: u64 = 16;
    /// Fixed simulation timestep in seconds
    pub const SIM_DT: f32 = TICK_MS as f32 / 1000.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Lane layout
    pub const LANE_COUNT: u8 = 3;
    pub const START_LANE: u8 = 1;

    /// Vertical track (entities scroll toward larger y)
    pub const VISIBLE_BOUND: f32 = 700.0;
    pub const SCROLL_FACTOR: f32 = 4.0;
    /// Player collision band (exclusive on both ends)
    pub const HIT_BAND_TOP: f32 = 450.0;
    pub const HIT_BAND_BOTTOM: f32 = 580.0;
    /// Jump height at or above which obstacles are cleared
    pub const JUMP_CLEARANCE: f32 = 60.0;

    /// Jump physics
    pub const GRAVITY: f32 = 0.8;
    pub const JUMP_POWER: f32 = 18.0;
    pub const JUMP_START_HEIGHT: f32 = 1.0;

    /// Session rules
    pub const MAX_MISTAKES: u8 = 3;
    pub const MISTAKE_INVULNERABILITY_MS: u64 = 2_000;
    pub const INVINCIBILITY_MS: u64 = 3_000;
    pub const MAGNET_MS: u64 = 5_000;
    pub const SCORE_BONUS: u64 = 100;
    /// Combo size per extra coin multiplier step
    pub const COMBO_STEP: u32 = 5;

    /// Distance per tick per unit of speed
    pub const DISTANCE_FACTOR: f32 = 1.5;

    /// Feedback exchange cadence
    pub const FEEDBACK_INTERVAL_MS: u64 = 5_000;
    /// Reaction time reported before any lane change was recorded
    pub const DEFAULT_REACTION_MS: u64 = 800;
}
