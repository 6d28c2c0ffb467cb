//! Difficulty feedback exchange
//!
//! Every interval of active play a performance snapshot is handed to a
//! `DifficultyService`. The service answers through a oneshot channel that
//! the session polls once per frame, so a slow or dead service never holds
//! up a tick. At most one request is in flight at a time.
//!
//! The send interval follows simulated play time. The answer timeout follows
//! real time, so a fast-forwarded run still waits for a healthy service.

pub mod http;

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::consts::FEEDBACK_INTERVAL_MS;
use crate::difficulty::{
    DifficultySettings, DifficultyTier, PerformanceSnapshot, calculate_difficulty,
};
use crate::sim::{GamePhase, GameState};

pub use http::HttpDifficultyClient;

/// Default time an exchange may stay unanswered before falling back
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// Difficulty exchange errors
#[derive(Debug, Error)]
pub enum FeedbackError {
    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with a non-2xx status
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The task answering the request went away
    #[error("Feedback channel closed")]
    Closed,

    /// No answer within the exchange timeout
    #[error("Request timed out")]
    Timeout,

    /// Body didn't match the response shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Request body for `POST /api/player/update`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyRequest {
    pub score: f64,
    pub reaction_time: f64,
    pub mistakes: f64,
    pub speed: f64,
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub combo: f64,
}

impl From<PerformanceSnapshot> for DifficultyRequest {
    fn from(s: PerformanceSnapshot) -> Self {
        Self {
            score: s.score,
            reaction_time: s.reaction_time_ms,
            mistakes: s.mistakes,
            speed: s.speed,
            distance: s.distance,
            combo: s.combo,
        }
    }
}

impl From<DifficultyRequest> for PerformanceSnapshot {
    fn from(r: DifficultyRequest) -> Self {
        Self {
            score: r.score,
            reaction_time_ms: r.reaction_time,
            mistakes: r.mistakes,
            speed: r.speed,
            distance: r.distance,
            combo: r.combo,
        }
    }
}

/// Tier settings as they travel over the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSettings {
    #[serde(rename = "gameSpeed")]
    pub game_speed: f64,
    pub lives: u32,
    pub description: String,
}

impl From<DifficultySettings> for WireSettings {
    fn from(s: DifficultySettings) -> Self {
        Self {
            game_speed: s.speed_multiplier,
            lives: s.lives_allowed,
            description: s.description.to_string(),
        }
    }
}

/// The part of the service's answer the client relies on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyResponse {
    pub difficulty: DifficultyTier,
    pub settings: WireSettings,
}

impl DifficultyResponse {
    pub fn for_tier(tier: DifficultyTier) -> Self {
        Self {
            difficulty: tier,
            settings: tier.settings().into(),
        }
    }
}

/// Answer to a submitted snapshot, polled without blocking
pub type PendingFeedback = oneshot::Receiver<Result<DifficultyResponse, FeedbackError>>;

/// Something that turns a snapshot into a tier, eventually
pub trait DifficultyService: Send {
    fn submit(&self, request: DifficultyRequest) -> PendingFeedback;
}

/// In-process rule engine; answers immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDifficultyService;

impl DifficultyService for LocalDifficultyService {
    fn submit(&self, request: DifficultyRequest) -> PendingFeedback {
        let (tx, rx) = oneshot::channel();
        let tier = calculate_difficulty(&request.into());
        // Receiver is returned below, so this can't fail
        let _ = tx.send(Ok(DifficultyResponse::for_tier(tier)));
        rx
    }
}

/// Where the current tier comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FeedbackMode {
    /// Score-based tier, no exchange has completed yet
    #[default]
    Local,
    /// Tier returned by the difficulty service
    Remote,
    /// Last exchange failed; score-based tier ("offline/local adjustment")
    LocalFallback,
}

/// Result of polling an in-flight exchange
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackOutcome {
    Applied(DifficultyTier),
    FellBack(String),
    /// Response arrived (or was pending) after the run ended
    Discarded,
}

struct InFlight {
    rx: PendingFeedback,
    sent_at: Instant,
}

/// Periodic difficulty exchange driven by simulated play time
pub struct FeedbackExchange {
    service: Option<Box<dyn DifficultyService>>,
    interval_ms: u64,
    timeout: Duration,
    elapsed_ms: u64,
    in_flight: Option<InFlight>,
    mode: FeedbackMode,
    last_settings: Option<WireSettings>,
    /// Intervals skipped because an exchange was still pending
    pub skipped: u32,
    /// Requests handed to the service
    pub sent: u32,
}

impl FeedbackExchange {
    pub fn new(service: Option<Box<dyn DifficultyService>>) -> Self {
        Self {
            service,
            interval_ms: FEEDBACK_INTERVAL_MS,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            elapsed_ms: 0,
            in_flight: None,
            mode: FeedbackMode::Local,
            last_settings: None,
            skipped: 0,
            sent: 0,
        }
    }

    pub fn with_interval(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms.max(1);
        self
    }

    /// Real time an exchange may stay unanswered
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Duration::from_millis(timeout_ms);
        self
    }

    pub fn mode(&self) -> FeedbackMode {
        self.mode
    }

    pub fn last_settings(&self) -> Option<&WireSettings> {
        self.last_settings.as_ref()
    }

    pub fn has_service(&self) -> bool {
        self.service.is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Forget timers and any pending exchange (new run)
    pub fn reset(&mut self) {
        if self.in_flight.take().is_some() {
            log::debug!("Dropping pending difficulty exchange");
        }
        self.elapsed_ms = 0;
        self.mode = FeedbackMode::Local;
        self.last_settings = None;
        self.skipped = 0;
        self.sent = 0;
    }

    /// Account for `dt_ms` of simulated time. Returns true if a request
    /// was sent this call.
    pub fn advance(&mut self, dt_ms: u64, state: &GameState) -> bool {
        if state.phase != GamePhase::Playing {
            return false;
        }
        // The play timer only runs once there is something to report
        if state.score == 0 {
            return false;
        }

        self.elapsed_ms += dt_ms;
        if self.elapsed_ms < self.interval_ms {
            return false;
        }
        self.elapsed_ms -= self.interval_ms;

        let Some(service) = self.service.as_ref() else {
            return false;
        };
        if self.in_flight.is_some() {
            self.skipped += 1;
            log::debug!("Difficulty exchange still pending, skipping interval");
            return false;
        }

        let request = DifficultyRequest::from(state.snapshot());
        log::debug!("Sending performance snapshot: {:?}", request);
        self.in_flight = Some(InFlight {
            rx: service.submit(request),
            sent_at: Instant::now(),
        });
        self.sent += 1;
        true
    }

    /// Check the pending exchange and apply its result
    pub fn poll(&mut self, state: &mut GameState) -> Option<FeedbackOutcome> {
        let pending = self.in_flight.as_mut()?;

        if !state.is_active() {
            self.in_flight = None;
            log::debug!("Discarding difficulty response after game over");
            return Some(FeedbackOutcome::Discarded);
        }

        let result = match pending.rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) if pending.sent_at.elapsed() < self.timeout => return None,
            Err(TryRecvError::Empty) => Err(FeedbackError::Timeout),
            Err(TryRecvError::Closed) => Err(FeedbackError::Closed),
        };
        self.in_flight = None;

        Some(match result {
            Ok(response) => {
                state.apply_remote_tier(response.difficulty);
                self.mode = FeedbackMode::Remote;
                self.last_settings = Some(response.settings);
                FeedbackOutcome::Applied(response.difficulty)
            }
            Err(e) => {
                log::warn!("Difficulty service unavailable, using local adjustment: {}", e);
                state.clear_remote_tier();
                self.mode = FeedbackMode::LocalFallback;
                self.last_settings = None;
                FeedbackOutcome::FellBack(e.to_string())
            }
        })
    }
}

impl std::fmt::Debug for FeedbackExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackExchange")
            .field("has_service", &self.service.is_some())
            .field("interval_ms", &self.interval_ms)
            .field("elapsed_ms", &self.elapsed_ms)
            .field("pending", &self.in_flight.is_some())
            .field("mode", &self.mode)
            .finish()
    }
}
