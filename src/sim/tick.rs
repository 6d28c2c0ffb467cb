//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically.

use super::collision::{first_overlap, lane_gap};
use super::spawn::{spawn_coins, spawn_obstacle, spawn_power_up};
use super::state::{EntityKind, GameEvent, GamePhase, GameState, PowerUpKind};
use crate::consts::*;

/// Lane change direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneMove {
    Left,
    Right,
}

impl LaneMove {
    fn delta(self) -> i8 {
        match self {
            LaneMove::Left => -1,
            LaneMove::Right => 1,
        }
    }
}

/// A buffered lane change and the wall-clock ms it was requested at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneChange {
    pub direction: LaneMove,
    pub at_ms: u64,
}

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Most recent lane change since the previous tick
    pub lane_change: Option<LaneChange>,
    /// Jump (space/up)
    pub jump: bool,
}

impl TickInput {
    pub fn is_empty(&self) -> bool {
        self.lane_change.is_none() && !self.jump
    }
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput) {
    // Paused, finished or not yet started sessions don't advance
    if state.phase != GamePhase::Playing {
        return;
    }

    state.time_ticks += 1;
    state.time_ms += TICK_MS;

    apply_input(state, input);

    // 1. Jump physics
    if state.runner.step_jump() {
        state.events.push(GameEvent::Landed);
    }

    // 2. Scroll entities and drop what left the track
    scroll_entities(state);

    // 3-5. Spawning
    spawn_obstacle(state);
    spawn_coins(state);
    spawn_power_up(state);

    // 6. Obstacle hits (may end the run)
    resolve_obstacle_hit(state);
    if state.phase == GamePhase::GameOver {
        return;
    }

    // 7-8. Pickups
    resolve_coin(state);
    resolve_power_up(state);

    // 9. Distance and speed progression
    state.distance += state.speed * DISTANCE_FACTOR;
    state.refresh_tier();
    state.speed = state.tier.speed_at(state.distance);
}

/// Apply buffered input; rejected moves are dropped silently
pub fn apply_input(state: &mut GameState, input: &TickInput) {
    if let Some(change) = input.lane_change {
        if state.runner.shift_lane(change.direction.delta()) {
            state.reaction_time_ms = Some(change.at_ms.saturating_sub(state.last_move_at_ms));
            state.last_move_at_ms = change.at_ms;
        }
    }
    if input.jump {
        state.runner.start_jump();
    }
}

fn scroll_entities(state: &mut GameState) {
    let step = state.speed * SCROLL_FACTOR;
    let magnet = state.magnet_active();
    let lane = state.runner.lane;

    for entity in &mut state.entities {
        entity.y += step;
        if magnet && entity.is_coin() && lane_gap(entity.lane, lane) <= 1 {
            entity.lane = lane;
        }
    }
    state.entities.retain(|e| e.y < VISIBLE_BOUND);
}

fn resolve_obstacle_hit(state: &mut GameState) {
    if state.runner.clears_obstacles() {
        return;
    }
    let Some(id) = first_overlap(&state.entities, state.runner.lane, |e| e.is_obstacle()) else {
        return;
    };
    state.remove_entity(id);

    if state.effects.shield_active {
        state.effects.shield_active = false;
        state.events.push(GameEvent::ShieldAbsorbed);
        return;
    }

    if state.is_invulnerable() {
        state.events.push(GameEvent::HitIgnored);
        return;
    }

    state.mistakes += 1;
    state.combo = 0;
    state
        .effects
        .grant_invulnerability(state.time_ms, MISTAKE_INVULNERABILITY_MS);
    state.events.push(GameEvent::Mistake {
        mistakes: state.mistakes,
    });
    log::debug!("Mistake {}/{}", state.mistakes, MAX_MISTAKES);

    if state.mistakes >= MAX_MISTAKES {
        state.phase = GamePhase::GameOver;
        state.events.push(GameEvent::GameOver);
    }
}

fn resolve_coin(state: &mut GameState) {
    let Some(id) = first_overlap(&state.entities, state.runner.lane, |e| e.is_coin()) else {
        return;
    };
    let Some(EntityKind::Coin { value, .. }) = state
        .entities
        .iter()
        .find(|e| e.id == id)
        .map(|e| e.kind)
    else {
        return;
    };
    state.remove_entity(id);

    state.combo += 1;
    let points = coin_points(value, state.combo);
    state.score += points;
    state.max_combo = state.max_combo.max(state.combo);
    state.events.push(GameEvent::CoinCollected {
        points,
        combo: state.combo,
    });
}

/// Score for a coin collected at `combo` (already incremented)
pub fn coin_points(value: u32, combo: u32) -> u64 {
    value as u64 * (combo / COMBO_STEP + 1) as u64
}

fn resolve_power_up(state: &mut GameState) {
    let Some(id) = first_overlap(&state.entities, state.runner.lane, |e| e.is_power_up()) else {
        return;
    };
    let Some(EntityKind::PowerUp(kind)) = state
        .entities
        .iter()
        .find(|e| e.id == id)
        .map(|e| e.kind)
    else {
        return;
    };
    state.remove_entity(id);

    match kind {
        PowerUpKind::Shield => state.effects.shield_active = true,
        PowerUpKind::Magnet => {
            state.effects.magnet_until_ms = state.time_ms + MAGNET_MS;
        }
        PowerUpKind::ScoreBonus => state.score += SCORE_BONUS,
        PowerUpKind::Invincibility => {
            state
                .effects
                .grant_invulnerability(state.time_ms, INVINCIBILITY_MS);
        }
    }
    state.events.push(GameEvent::PowerUpCollected(kind));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::difficulty::DifficultyTier;
    use crate::sim::state::{CoinTier, ObstacleKind};
    use proptest::prelude::*;

    fn playing(seed: u64) -> GameState {
        let mut state = GameState::new(seed);
        state.phase = GamePhase::Playing;
        state
    }

    /// Position that lands in the hit band after one scroll at speed 1
    const BAND_Y: f32 = 500.0 - SCROLL_FACTOR;

    fn place_obstacle(state: &mut GameState, lane: u8) -> u32 {
        state.spawn(lane, BAND_Y, EntityKind::Obstacle(ObstacleKind::Barrier))
    }

    #[test]
    fn test_tick_requires_playing() {
        let mut state = GameState::new(1);
        tick(&mut state, &TickInput::default());
        assert_eq!(state.time_ticks, 0);

        state.phase = GamePhase::Paused;
        tick(&mut state, &TickInput::default());
        assert_eq!(state.time_ticks, 0);

        state.phase = GamePhase::Playing;
        tick(&mut state, &TickInput::default());
        assert_eq!(state.time_ticks, 1);
        assert_eq!(state.time_ms, TICK_MS);
    }

    #[test]
    fn test_pause_resumes_from_identical_state() {
        let mut state = playing(5);
        for _ in 0..100 {
            tick(&mut state, &TickInput::default());
        }
        state.toggle_pause();
        let frozen = (state.time_ticks, state.distance, state.entities.clone());
        for _ in 0..50 {
            tick(&mut state, &TickInput::default());
        }
        assert_eq!((state.time_ticks, state.distance, state.entities.clone()), frozen);
        state.toggle_pause();
        tick(&mut state, &TickInput::default());
        assert_eq!(state.time_ticks, frozen.0 + 1);
    }

    #[test]
    fn test_lane_change_records_reaction_time() {
        let mut state = playing(1);
        let input = TickInput {
            lane_change: Some(LaneChange {
                direction: LaneMove::Left,
                at_ms: 700,
            }),
            ..Default::default()
        };
        tick(&mut state, &input);
        assert_eq!(state.runner.lane, 0);
        assert_eq!(state.reaction_time_ms, Some(700));

        // Rejected at boundary: no reaction time update
        let input = TickInput {
            lane_change: Some(LaneChange {
                direction: LaneMove::Left,
                at_ms: 900,
            }),
            ..Default::default()
        };
        tick(&mut state, &input);
        assert_eq!(state.runner.lane, 0);
        assert_eq!(state.reaction_time_ms, Some(700));
        assert_eq!(state.last_move_at_ms, 700);
    }

    #[test]
    fn test_obstacle_hit_counts_mistake_and_resets_combo() {
        let mut state = playing(1);
        state.combo = 7;
        let id = place_obstacle(&mut state, 1);
        tick(&mut state, &TickInput::default());

        assert_eq!(state.mistakes, 1);
        assert_eq!(state.combo, 0);
        assert!(state.is_invulnerable());
        assert!(state.entities.iter().all(|e| e.id != id));
    }

    #[test]
    fn test_jump_clears_obstacle() {
        let mut state = playing(1);
        state.runner.jump_height = 100.0;
        state.runner.jump_velocity = 5.0;
        state.runner.is_jumping = true;
        place_obstacle(&mut state, 1);
        tick(&mut state, &TickInput::default());
        assert_eq!(state.mistakes, 0);
    }

    #[test]
    fn test_obstacle_in_other_lane_is_harmless() {
        let mut state = playing(1);
        place_obstacle(&mut state, 2);
        tick(&mut state, &TickInput::default());
        assert_eq!(state.mistakes, 0);
    }

    #[test]
    fn test_shield_absorbs_exactly_one_hit() {
        let mut state = playing(1);
        state.effects.shield_active = true;
        place_obstacle(&mut state, 1);
        tick(&mut state, &TickInput::default());
        assert_eq!(state.mistakes, 0);
        assert!(!state.effects.shield_active);
        assert!(!state.is_invulnerable());

        place_obstacle(&mut state, 1);
        tick(&mut state, &TickInput::default());
        assert_eq!(state.mistakes, 1);
    }

    #[test]
    fn test_invulnerability_absorbs_repeated_hits() {
        let mut state = playing(1);
        place_obstacle(&mut state, 1);
        tick(&mut state, &TickInput::default());
        assert_eq!(state.mistakes, 1);

        for _ in 0..3 {
            let id = place_obstacle(&mut state, 1);
            tick(&mut state, &TickInput::default());
            assert!(state.entities.iter().all(|e| e.id != id));
        }
        assert_eq!(state.mistakes, 1);
        assert!(state.drain_events().contains(&GameEvent::HitIgnored));
    }

    #[test]
    fn test_third_mistake_ends_run() {
        let mut state = playing(1);
        state.mistakes = 2;
        state.score = 40;
        place_obstacle(&mut state, 1);
        tick(&mut state, &TickInput::default());

        assert_eq!(state.mistakes, MAX_MISTAKES);
        assert_eq!(state.phase, GamePhase::GameOver);
        let events = state.drain_events();
        assert_eq!(events.iter().filter(|e| **e == GameEvent::GameOver).count(), 1);

        // Nothing advances after game over
        let ticks = state.time_ticks;
        tick(&mut state, &TickInput::default());
        assert_eq!(state.time_ticks, ticks);
    }

    #[test]
    fn test_coin_multiplier_at_combo_twelve() {
        let mut state = playing(1);
        state.combo = 11;
        state.spawn(
            1,
            BAND_Y,
            EntityKind::Coin {
                value: 10,
                tier: CoinTier::Normal,
            },
        );
        tick(&mut state, &TickInput::default());

        assert_eq!(state.combo, 12);
        assert_eq!(state.score, 30);
        assert_eq!(state.max_combo, 12);
    }

    #[test]
    fn test_combo_increments_by_one_per_coin() {
        let mut state = playing(1);
        for expected in 1..=6u32 {
            state.spawn(
                1,
                BAND_Y,
                EntityKind::Coin {
                    value: 10,
                    tier: CoinTier::Normal,
                },
            );
            tick(&mut state, &TickInput::default());
            assert_eq!(state.combo, expected);
            // keep speed at 1 so BAND_Y lands in the band
            state.speed = 1.0;
        }
        assert_eq!(coin_points(10, 5), 20);
    }

    #[test]
    fn test_power_up_effects() {
        let mut state = playing(1);
        let spawn_power = |state: &mut GameState, kind| {
            state.speed = 1.0;
            state.spawn(1, BAND_Y, EntityKind::PowerUp(kind));
        };

        spawn_power(&mut state, PowerUpKind::Shield);
        tick(&mut state, &TickInput::default());
        assert!(state.effects.shield_active);

        spawn_power(&mut state, PowerUpKind::ScoreBonus);
        let before = state.score;
        tick(&mut state, &TickInput::default());
        assert_eq!(state.score, before + SCORE_BONUS);

        spawn_power(&mut state, PowerUpKind::Magnet);
        tick(&mut state, &TickInput::default());
        assert!(state.magnet_active());
        assert_eq!(state.effects.magnet_until_ms, state.time_ms + MAGNET_MS);

        spawn_power(&mut state, PowerUpKind::Invincibility);
        tick(&mut state, &TickInput::default());
        assert_eq!(
            state.effects.invulnerable_until_ms,
            state.time_ms + INVINCIBILITY_MS
        );
    }

    #[test]
    fn test_magnet_pulls_adjacent_coins() {
        let mut state = playing(1);
        state.runner.lane = 0;
        state.effects.magnet_until_ms = 10_000;
        let coin = EntityKind::Coin {
            value: 10,
            tier: CoinTier::Normal,
        };
        let near = state.spawn(1, 100.0, coin);
        let far = state.spawn(2, 100.0, coin);
        tick(&mut state, &TickInput::default());

        let lane_of = |id| state.entities.iter().find(|e| e.id == id).map(|e| e.lane);
        assert_eq!(lane_of(near), Some(0));
        assert_eq!(lane_of(far), Some(2));
    }

    #[test]
    fn test_magnet_expires() {
        let mut state = playing(1);
        state.effects.magnet_until_ms = TICK_MS;
        tick(&mut state, &TickInput::default());
        assert!(!state.magnet_active());
    }

    #[test]
    fn test_speed_follows_tier_curve() {
        let mut state = playing(1);
        state.distance = 10_000.0;
        state.score = 120;
        tick(&mut state, &TickInput::default());
        assert_eq!(state.tier, DifficultyTier::Hard);
        assert_eq!(state.speed, DifficultyTier::Hard.speed_cap());

        state.apply_remote_tier(DifficultyTier::Easy);
        tick(&mut state, &TickInput::default());
        assert_eq!(state.speed, DifficultyTier::Easy.speed_cap());
    }

    #[test]
    fn test_entities_leave_past_bound() {
        let mut state = playing(1);
        let id = state.spawn(0, VISIBLE_BOUND - 1.0, EntityKind::Obstacle(ObstacleKind::Car));
        tick(&mut state, &TickInput::default());
        assert!(state.entities.iter().all(|e| e.id != id));
    }

    #[test]
    fn test_determinism() {
        // Two states with same seed should produce identical results
        let mut state1 = playing(99999);
        let mut state2 = playing(99999);

        let inputs = [
            TickInput {
                lane_change: Some(LaneChange {
                    direction: LaneMove::Right,
                    at_ms: 10,
                }),
                ..Default::default()
            },
            TickInput {
                jump: true,
                ..Default::default()
            },
            TickInput::default(),
        ];

        for _ in 0..500 {
            for input in &inputs {
                tick(&mut state1, input);
                tick(&mut state2, input);
            }
        }

        assert_eq!(state1.time_ticks, state2.time_ticks);
        assert_eq!(state1.entities, state2.entities);
        assert_eq!(state1.score, state2.score);
        assert_eq!(state1.mistakes, state2.mistakes);
    }

    proptest! {
        #[test]
        fn prop_entities_strictly_descend(seed in any::<u64>(), ticks in 1usize..400) {
            let mut state = playing(seed);
            for _ in 0..ticks {
                let before: Vec<(u32, f32)> = state.entities.iter().map(|e| (e.id, e.y)).collect();
                tick(&mut state, &TickInput::default());
                for (id, y) in before {
                    if let Some(e) = state.entities.iter().find(|e| e.id == id) {
                        prop_assert!(e.y > y);
                    }
                }
                if state.phase == GamePhase::GameOver {
                    break;
                }
            }
        }

        #[test]
        fn prop_mistakes_never_decrease(seed in any::<u64>()) {
            let mut state = playing(seed);
            let mut last = 0;
            for _ in 0..3_000 {
                tick(&mut state, &TickInput::default());
                prop_assert!(state.mistakes >= last);
                prop_assert!(state.mistakes <= MAX_MISTAKES);
                prop_assert_eq!(state.phase == GamePhase::GameOver, state.mistakes == MAX_MISTAKES);
                last = state.mistakes;
                if state.phase == GamePhase::GameOver {
                    break;
                }
            }
        }
    }
}
