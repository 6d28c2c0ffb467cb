//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No I/O or network dependencies

pub mod autopilot;
pub mod collision;
pub mod spawn;
pub mod state;
pub mod tick;

pub use autopilot::autopilot_input;
pub use collision::{first_overlap, in_hit_band, lane_occupied};
pub use state::{
    ActiveEffects, CoinTier, Entity, EntityKind, GameEvent, GamePhase, GameState, ObstacleKind,
    PowerUpKind, Runner,
};
pub use tick::{LaneChange, LaneMove, TickInput, tick};
