//! Autopilot that plays the game (headless runs and demo mode)

use super::collision::lane_occupied;
use super::state::{Entity, GameState};
use super::tick::{LaneChange, LaneMove, TickInput};
use crate::consts::*;

/// How far above the hit band the autopilot starts reacting to obstacles
const LOOKAHEAD: f32 = 220.0;

fn threat_window() -> (f32, f32) {
    (HIT_BAND_TOP - LOOKAHEAD, HIT_BAND_BOTTOM)
}

fn obstacle_ahead(state: &GameState, lane: u8) -> bool {
    let (lo, hi) = threat_window();
    lane_occupied(&state.entities, lane, lo, hi, Entity::is_obstacle)
}

fn step_toward(from: u8, to: u8, now_ms: u64) -> Option<LaneChange> {
    let direction = match to.cmp(&from) {
        std::cmp::Ordering::Less => LaneMove::Left,
        std::cmp::Ordering::Greater => LaneMove::Right,
        std::cmp::Ordering::Equal => return None,
    };
    Some(LaneChange {
        direction,
        at_ms: now_ms,
    })
}

/// Pick the input for the next tick
pub fn autopilot_input(state: &GameState, now_ms: u64) -> TickInput {
    let mut input = TickInput::default();
    let lane = state.runner.lane;

    if obstacle_ahead(state, lane) && !state.runner.is_airborne() {
        // Prefer dodging sideways; jump when boxed in
        let escape = [lane.checked_sub(1), lane.checked_add(1).filter(|&l| l < LANE_COUNT)]
            .into_iter()
            .flatten()
            .find(|&l| !obstacle_ahead(state, l));
        match escape {
            Some(target) => input.lane_change = step_toward(lane, target, now_ms),
            None => input.jump = true,
        }
        return input;
    }

    // Safe: go for the closest pickup whose lane is clear
    let target = state
        .entities
        .iter()
        .filter(|e| !e.is_obstacle() && e.y < HIT_BAND_BOTTOM)
        .filter(|e| e.lane.abs_diff(lane) <= 1 && !obstacle_ahead(state, e.lane))
        .max_by(|a, b| a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
        .map(|e| e.lane);

    if let Some(target) = target {
        input.lane_change = step_toward(lane, target, now_ms);
    }
    input
}
