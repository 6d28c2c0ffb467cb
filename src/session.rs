//! Session driver
//!
//! Owns the game state and serializes everything that touches it: buffered
//! input, fixed-timestep ticks, the difficulty exchange and the single
//! end-of-run finalization.

use std::path::PathBuf;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::consts::*;
use crate::difficulty::DifficultyTier;
use crate::feedback::{FeedbackExchange, FeedbackMode, FeedbackOutcome};
use crate::highscores::HighScores;
use crate::sim::{
    GameEvent, GamePhase, GameState, LaneChange, LaneMove, TickInput, autopilot_input, tick,
};
use crate::stats::{AggregateStats, RunResult, SessionSummary, StatsRepository};

/// Player input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    MoveLeft,
    MoveRight,
    Jump,
    TogglePause,
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EndReason {
    UserStopped,
    MistakeLimit,
}

/// Result of the one-time end-of-run processing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeOutcome {
    pub reason: EndReason,
    pub summary: SessionSummary,
    /// Updated totals, if the stats store accepted the summary
    pub stats: Option<AggregateStats>,
    /// Rank on the local high-score board, if the run made it
    pub high_score_rank: Option<usize>,
}

/// HUD-facing snapshot of the session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub phase: GamePhase,
    pub score: u64,
    pub distance: u64,
    pub speed: f32,
    pub tier: DifficultyTier,
    pub feedback_mode: FeedbackMode,
    /// Description from the last applied remote settings
    pub settings_description: Option<String>,
    pub lane: u8,
    pub mistakes: u8,
    pub combo: u32,
    pub shield: bool,
    pub magnet: bool,
    pub invulnerable: bool,
}

/// Where input timestamps come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clock {
    Wall,
    Simulated,
}

pub struct Session {
    state: GameState,
    accumulator: f32,
    input: TickInput,
    feedback: FeedbackExchange,
    stats: Box<dyn StatsRepository>,
    highscores: HighScores,
    highscores_path: Option<PathBuf>,
    finalized: Option<FinalizeOutcome>,
    autopilot: bool,
    clock: Clock,
    started_at: Instant,
}

impl Session {
    pub fn new(stats: Box<dyn StatsRepository>, feedback: FeedbackExchange) -> Self {
        Self {
            state: GameState::new(0),
            accumulator: 0.0,
            input: TickInput::default(),
            feedback,
            stats,
            highscores: HighScores::new(),
            highscores_path: None,
            finalized: None,
            autopilot: false,
            clock: Clock::Wall,
            started_at: Instant::now(),
        }
    }

    /// Record runs on `board`, saving it to `path` when it changes
    pub fn with_highscores(mut self, board: HighScores, path: Option<PathBuf>) -> Self {
        self.highscores = board;
        self.highscores_path = path;
        self
    }

    /// Let the autopilot pick inputs when the player gives none
    pub fn with_autopilot(mut self, enabled: bool) -> Self {
        self.autopilot = enabled;
        self
    }

    /// Timestamp input with simulated time instead of the wall clock
    /// (headless runs that don't advance in real time)
    pub fn with_simulated_clock(mut self) -> Self {
        self.clock = Clock::Simulated;
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn highscores(&self) -> &HighScores {
        &self.highscores
    }

    pub fn feedback(&self) -> &FeedbackExchange {
        &self.feedback
    }

    pub fn outcome(&self) -> Option<&FinalizeOutcome> {
        self.finalized.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_active()
    }

    fn now_ms(&self) -> u64 {
        match self.clock {
            Clock::Wall => self.started_at.elapsed().as_millis() as u64,
            Clock::Simulated => self.state.time_ms,
        }
    }

    /// Start a fresh run, dropping anything left from the previous one
    pub fn start(&mut self, seed: u64) {
        self.state = GameState::new(seed);
        self.state.phase = GamePhase::Playing;
        self.accumulator = 0.0;
        self.input = TickInput::default();
        self.feedback.reset();
        self.finalized = None;
        self.started_at = Instant::now();
        log::info!("Session started (seed {})", seed);
    }

    /// Buffer an input stamped with the session clock
    pub fn push_input(&mut self, event: InputEvent) {
        let now = self.now_ms();
        self.push_input_at(event, now);
    }

    /// Buffer an input that happened at `at_ms`
    pub fn push_input_at(&mut self, event: InputEvent, at_ms: u64) {
        if event == InputEvent::TogglePause {
            if self.state.toggle_pause() {
                // Nothing buffered survives a pause
                self.input = TickInput::default();
                log::info!(
                    "Session {}",
                    if self.state.is_paused() { "paused" } else { "resumed" }
                );
            }
            return;
        }
        if self.state.phase != GamePhase::Playing {
            return;
        }

        let direction = match event {
            InputEvent::MoveLeft => LaneMove::Left,
            InputEvent::MoveRight => LaneMove::Right,
            InputEvent::Jump => {
                self.input.jump = true;
                return;
            }
            InputEvent::TogglePause => return,
        };
        self.input.lane_change = Some(LaneChange { direction, at_ms });
    }

    /// Advance by `dt` seconds of real time. Returns the events produced.
    pub fn update(&mut self, dt: f32) -> Vec<GameEvent> {
        if !self.state.is_active() {
            return Vec::new();
        }
        self.poll_feedback();
        if self.state.is_paused() {
            return self.state.drain_events();
        }

        let dt = dt.min(0.1);
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.accumulator -= SIM_DT;
            substeps += 1;
            if !self.run_tick() {
                break;
            }
        }

        self.state.drain_events()
    }

    /// Run exactly one tick regardless of elapsed time
    pub fn step(&mut self) -> Vec<GameEvent> {
        if self.state.phase == GamePhase::Playing {
            self.poll_feedback();
            self.run_tick();
        }
        self.state.drain_events()
    }

    /// Returns false once the run is over
    fn run_tick(&mut self) -> bool {
        if self.autopilot && self.input.is_empty() {
            self.input = autopilot_input(&self.state, self.now_ms());
        }
        let input = std::mem::take(&mut self.input);
        tick(&mut self.state, &input);
        self.feedback.advance(TICK_MS, &self.state);

        if self.state.phase == GamePhase::GameOver {
            log::info!(
                "Game over: score {}, distance {:.0}",
                self.state.score,
                self.state.distance
            );
            self.finalize(EndReason::MistakeLimit);
            return false;
        }
        true
    }

    fn poll_feedback(&mut self) {
        match self.feedback.poll(&mut self.state) {
            Some(FeedbackOutcome::Applied(tier)) => log::debug!("Remote difficulty {}", tier),
            Some(FeedbackOutcome::FellBack(reason)) => {
                log::debug!("Local difficulty {} ({})", self.state.tier, reason)
            }
            Some(FeedbackOutcome::Discarded) | None => {}
        }
    }

    /// End the run. Safe to call more than once; only the first call
    /// finalizes.
    pub fn stop(&mut self) -> Option<&FinalizeOutcome> {
        if self.state.is_active() {
            log::info!("Session stopped at score {}", self.state.score);
            self.finalize(EndReason::UserStopped);
        }
        self.finalized.as_ref()
    }

    fn finalize(&mut self, reason: EndReason) {
        if self.finalized.is_some() {
            return;
        }
        self.state.phase = GamePhase::GameOver;
        self.accumulator = 0.0;
        self.input = TickInput::default();
        // Drops any exchange still in flight
        self.poll_feedback();

        let run = RunResult {
            score: self.state.score,
            distance: self.state.distance,
            mistakes: self.state.mistakes,
            max_combo: self.state.max_combo,
            play_time_ms: self.state.time_ms,
        };

        let (summary, stats) = match self.stats.get() {
            Ok(previous) => {
                let summary = SessionSummary::from_run(&previous, &run);
                let stats = match self.stats.update(&summary) {
                    Ok(stats) => Some(stats),
                    Err(e) => {
                        log::warn!("Failed to save session stats: {}", e);
                        None
                    }
                };
                (summary, stats)
            }
            Err(e) => {
                log::warn!("Stats unavailable, skipping submission: {}", e);
                (SessionSummary::from_run(&AggregateStats::default(), &run), None)
            }
        };

        let high_score_rank = self.record_high_score(&summary);
        if stats.is_some() {
            log::info!("Session stats saved (games played: {})", summary.games_played);
        }

        self.finalized = Some(FinalizeOutcome {
            reason,
            summary,
            stats,
            high_score_rank,
        });
    }

    fn record_high_score(&mut self, summary: &SessionSummary) -> Option<usize> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let rank = self.highscores.add_score(
            summary.last_game_score,
            summary.last_game_distance,
            timestamp,
        )?;
        log::info!("New high score #{}: {}", rank, summary.last_game_score);
        if let Some(path) = &self.highscores_path {
            if let Err(e) = self.highscores.save(path) {
                log::warn!("Failed to save high scores: {}", e);
            }
        }
        Some(rank)
    }

    pub fn status(&self) -> SessionStatus {
        let state = &self.state;
        SessionStatus {
            phase: state.phase,
            score: state.score,
            distance: state.distance.floor() as u64,
            speed: state.speed,
            tier: state.tier,
            feedback_mode: self.feedback.mode(),
            settings_description: self.feedback.last_settings().map(|s| s.description.clone()),
            lane: state.runner.lane,
            mistakes: state.mistakes,
            combo: state.combo,
            shield: state.effects.shield_active,
            magnet: state.magnet_active(),
            invulnerable: state.is_invulnerable(),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("phase", &self.state.phase)
            .field("score", &self.state.score)
            .field("feedback", &self.feedback)
            .field("finalized", &self.finalized.is_some())
            .finish()
    }
}
