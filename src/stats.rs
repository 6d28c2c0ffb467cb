//! Player stats aggregation and stores
//!
//! A finished run is folded into the player's running totals and handed to
//! a `StatsRepository`. Totals that count things (games, coins, play time)
//! are overwritten with the new value; records (high score, best distance,
//! max combo) only ever go up.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stats store errors
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stats store unavailable: {0}")]
    Unavailable(String),
}

/// Player totals as stored by the stats collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AggregateStats {
    pub games_played: u64,
    pub high_score: u64,
    pub total_coins: u64,
    pub best_distance: u64,
    /// Seconds
    pub total_play_time: u64,
    pub last_game_score: u64,
    pub last_game_distance: u64,
    pub last_game_mistakes: u8,
    pub max_combo: u32,
}

/// What one finished run contributed
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunResult {
    pub score: u64,
    pub distance: f32,
    pub mistakes: u8,
    pub max_combo: u32,
    pub play_time_ms: u64,
}

/// End-of-session summary submitted once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub games_played: u64,
    pub high_score: u64,
    pub total_coins: u64,
    pub best_distance: u64,
    pub total_play_time: u64,
    pub last_game_score: u64,
    pub last_game_distance: u64,
    pub last_game_mistakes: u8,
    pub max_combo: u32,
}

impl SessionSummary {
    /// New totals after `run`, starting from `previous`
    pub fn from_run(previous: &AggregateStats, run: &RunResult) -> Self {
        let distance = run.distance.max(0.0).floor() as u64;
        Self {
            games_played: previous.games_played + 1,
            high_score: previous.high_score.max(run.score),
            total_coins: previous.total_coins + run.score,
            best_distance: previous.best_distance.max(distance),
            total_play_time: previous.total_play_time + run.play_time_ms / 1000,
            last_game_score: run.score,
            last_game_distance: distance,
            last_game_mistakes: run.mistakes,
            max_combo: run.max_combo,
        }
    }
}

impl AggregateStats {
    /// Fold a submitted summary into the stored totals
    pub fn merge(&mut self, summary: &SessionSummary) {
        self.games_played = summary.games_played;
        self.total_coins = summary.total_coins;
        self.total_play_time = summary.total_play_time;

        self.high_score = self.high_score.max(summary.high_score);
        self.best_distance = self.best_distance.max(summary.best_distance);
        self.max_combo = self.max_combo.max(summary.max_combo);

        self.last_game_score = summary.last_game_score;
        self.last_game_distance = summary.last_game_distance;
        self.last_game_mistakes = summary.last_game_mistakes;
    }
}

/// Stats collaborator
pub trait StatsRepository: Send {
    /// Current totals
    fn get(&self) -> Result<AggregateStats, StatsError>;

    /// Submit a summary and return the updated totals
    fn update(&mut self, summary: &SessionSummary) -> Result<AggregateStats, StatsError>;
}

/// In-memory stats, useful for tests and offline play
#[derive(Debug, Clone, Default)]
pub struct MemoryStatsRepository {
    stats: AggregateStats,
    /// Number of summaries received
    pub submissions: usize,
}

impl MemoryStatsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stats(stats: AggregateStats) -> Self {
        Self {
            stats,
            submissions: 0,
        }
    }
}

impl StatsRepository for MemoryStatsRepository {
    fn get(&self) -> Result<AggregateStats, StatsError> {
        Ok(self.stats)
    }

    fn update(&mut self, summary: &SessionSummary) -> Result<AggregateStats, StatsError> {
        self.submissions += 1;
        self.stats.merge(summary);
        Ok(self.stats)
    }
}

/// Stats persisted as a JSON profile file
#[derive(Debug, Clone)]
pub struct JsonFileStatsRepository {
    path: PathBuf,
}

impl JsonFileStatsRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatsRepository for JsonFileStatsRepository {
    fn get(&self) -> Result<AggregateStats, StatsError> {
        match fs::read_to_string(&self.path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AggregateStats::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn update(&mut self, summary: &SessionSummary) -> Result<AggregateStats, StatsError> {
        let mut stats = self.get()?;
        stats.merge(summary);
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&stats)?)?;
        log::info!("Stats saved to {}", self.path.display());
        Ok(stats)
    }
}
