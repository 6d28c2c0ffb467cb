//! Stochastic spawning of obstacles, coins and power-ups
//!
//! All randomness comes from the state's seeded RNG, so a run replays
//! exactly for the same seed and inputs.

use rand::Rng;

use super::collision::lane_occupied;
use super::state::{CoinTier, EntityKind, GameState, ObstacleKind, PowerUpKind};
use crate::consts::LANE_COUNT;

/// Obstacle spawn probability per tick at speed 0
pub const BASE_OBSTACLE_RATE: f64 = 0.012;
/// Extra obstacle probability per unit of speed
pub const OBSTACLE_RATE_SLOPE: f64 = 0.003;
pub const OBSTACLE_SPAWN_Y: f32 = -100.0;
/// Trailing window in which a lane may hold only one obstacle
pub const OBSTACLE_WINDOW: (f32, f32) = (-200.0, 100.0);

pub const COIN_RATE: f64 = 0.006;
pub const COIN_SPAWN_Y: f32 = -80.0;
/// Vertical gap between consecutive coins of one pattern
pub const COIN_PATTERN_SPACING: f32 = 50.0;
/// A lane already holding a coin in this window gets no new coin
pub const COIN_WINDOW: (f32, f32) = (-150.0, 50.0);
/// Lane patterns: single center, full line, both sides
pub const COIN_PATTERNS: [&[u8]; 3] = [&[1], &[0, 1, 2], &[0, 2]];

pub const POWER_UP_RATE: f64 = 0.001;
/// Power-ups only appear once the score is above this
pub const POWER_UP_SCORE_FLOOR: u64 = 50;
pub const POWER_UP_SPAWN_Y: f32 = -80.0;

/// Probability of an obstacle spawn this tick
pub fn obstacle_rate(speed: f32) -> f64 {
    (BASE_OBSTACLE_RATE + speed as f64 * OBSTACLE_RATE_SLOPE).clamp(0.0, 1.0)
}

/// Coin value and tier for the current combo
pub fn coin_for_combo(combo: u32) -> (u32, CoinTier) {
    let value = if combo > 10 {
        25
    } else if combo > 5 {
        15
    } else {
        10
    };
    let tier = if combo > 15 {
        CoinTier::Diamond
    } else if combo > 10 {
        CoinTier::Golden
    } else {
        CoinTier::Normal
    };
    (value, tier)
}

/// Maybe spawn one obstacle on a lane without an obstacle in the trailing window
pub fn spawn_obstacle(state: &mut GameState) -> Option<u32> {
    if !state.rng.random_bool(obstacle_rate(state.speed)) {
        return None;
    }

    let (lo, hi) = OBSTACLE_WINDOW;
    let free_lanes: Vec<u8> = (0..LANE_COUNT)
        .filter(|&lane| !lane_occupied(&state.entities, lane, lo, hi, |e| e.is_obstacle()))
        .collect();
    if free_lanes.is_empty() {
        return None;
    }

    let lane = free_lanes[state.rng.random_range(0..free_lanes.len())];
    let kind = ObstacleKind::ALL[state.rng.random_range(0..ObstacleKind::ALL.len())];
    Some(state.spawn(lane, OBSTACLE_SPAWN_Y, EntityKind::Obstacle(kind)))
}

/// Maybe spawn a coin pattern; returns the number of coins placed
pub fn spawn_coins(state: &mut GameState) -> usize {
    if !state.rng.random_bool(COIN_RATE) {
        return 0;
    }

    let pattern = COIN_PATTERNS[state.rng.random_range(0..COIN_PATTERNS.len())];
    let (value, tier) = coin_for_combo(state.combo);
    let (lo, hi) = COIN_WINDOW;

    let mut placed = 0;
    for (i, &lane) in pattern.iter().enumerate() {
        if lane_occupied(&state.entities, lane, lo, hi, |e| e.is_coin()) {
            continue;
        }
        let y = COIN_SPAWN_Y - i as f32 * COIN_PATTERN_SPACING;
        state.spawn(lane, y, EntityKind::Coin { value, tier });
        placed += 1;
    }
    placed
}

/// Maybe spawn a power-up once the score floor is passed
pub fn spawn_power_up(state: &mut GameState) -> Option<u32> {
    if state.score <= POWER_UP_SCORE_FLOOR {
        return None;
    }
    if !state.rng.random_bool(POWER_UP_RATE) {
        return None;
    }

    let kind = PowerUpKind::ALL[state.rng.random_range(0..PowerUpKind::ALL.len())];
    let lane = state.rng.random_range(0..LANE_COUNT);
    Some(state.spawn(lane, POWER_UP_SPAWN_Y, EntityKind::PowerUp(kind)))
}
