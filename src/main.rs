//! Lane Dash headless runner
//!
//! Plays one run with the autopilot, exchanging performance snapshots with
//! the difficulty service when one is configured, and prints the final
//! status and summary as JSON.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use lane_dash::feedback::{
    DifficultyService, FeedbackExchange, HttpDifficultyClient, LocalDifficultyService,
};
use lane_dash::session::Session;
use lane_dash::sim::GameEvent;
use lane_dash::stats::JsonFileStatsRepository;
use lane_dash::{HighScores, Settings};
use tokio::runtime::Handle;

#[derive(Parser, Debug)]
#[command(name = "lane-dash")]
#[command(about = "Headless Lane Dash run driven by the autopilot")]
struct Cli {
    /// Settings file (JSON); defaults are used when it doesn't exist
    #[arg(long, default_value = "lane_dash.json")]
    config: PathBuf,
    /// Run seed (random when omitted)
    #[arg(long)]
    seed: Option<u64>,
    /// Difficulty service base URL, e.g. http://127.0.0.1:5000
    #[arg(long)]
    api_url: Option<String>,
    /// Use the in-process rule engine when no service URL is set
    #[arg(long)]
    local_engine: bool,
    /// Tick as fast as possible instead of in real time
    #[arg(long)]
    fast: bool,
    /// Stop the run after this many seconds of play
    #[arg(long, default_value_t = 120)]
    max_seconds: u64,
    /// Stats profile file (overrides settings)
    #[arg(long)]
    stats: Option<PathBuf>,
}

fn build_service(settings: &Settings, local_engine: bool) -> Result<Option<Box<dyn DifficultyService>>> {
    if let Some(url) = &settings.api_base_url {
        let client = HttpDifficultyClient::new(
            url,
            Duration::from_millis(settings.request_timeout_ms),
            Handle::current(),
        )
        .context("failed to build difficulty client")?;
        log::info!("Difficulty service at {}", client.endpoint());
        return Ok(Some(Box::new(client)));
    }
    if local_engine {
        log::info!("Using in-process difficulty engine");
        return Ok(Some(Box::new(LocalDifficultyService)));
    }
    log::info!("No difficulty service configured, using local adjustment");
    Ok(None)
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::Mistake { mistakes } => log::info!("Hit! mistakes: {}", mistakes),
        GameEvent::ShieldAbsorbed => log::info!("Shield absorbed a hit"),
        GameEvent::PowerUpCollected(kind) => log::info!("Power-up: {:?}", kind),
        GameEvent::CoinCollected { points, combo } if *combo > 0 && combo % 10 == 0 => {
            log::info!("Combo x{} (+{})", combo, points)
        }
        _ => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut settings = Settings::load(&cli.config)
        .with_context(|| format!("failed to load settings from {}", cli.config.display()))?
        .with_env_overrides();
    if cli.api_url.is_some() {
        settings.api_base_url = cli.api_url.clone();
    }
    if let Some(path) = &cli.stats {
        settings.stats_path = path.clone();
    }
    let seed = cli.seed.or(settings.seed).unwrap_or_else(rand::random);

    let feedback = FeedbackExchange::new(build_service(&settings, cli.local_engine)?)
        .with_interval(settings.feedback_interval_ms)
        .with_timeout(settings.request_timeout_ms);

    let highscores = HighScores::load(&settings.highscores_path).unwrap_or_else(|e| {
        log::warn!("Ignoring unreadable high scores: {}", e);
        HighScores::new()
    });

    let mut session = Session::new(
        Box::new(JsonFileStatsRepository::new(settings.stats_path.clone())),
        feedback,
    )
    .with_highscores(highscores, Some(settings.highscores_path.clone()))
    .with_autopilot(true);
    if cli.fast {
        session = session.with_simulated_clock();
    }

    let limit_ms = cli.max_seconds.saturating_mul(1000);
    session.start(seed);

    if cli.fast {
        while session.is_running() && session.state().time_ms < limit_ms {
            session.step().iter().for_each(log_event);
            // Let in-flight exchanges make progress
            if session.state().time_ticks % 64 == 0 {
                tokio::task::yield_now().await;
            }
        }
    } else {
        let mut frame = tokio::time::interval(Duration::from_millis(16));
        let mut last = Instant::now();
        while session.is_running() && session.state().time_ms < limit_ms {
            frame.tick().await;
            let now = Instant::now();
            let dt = now.duration_since(last).as_secs_f32();
            last = now;
            session.update(dt).iter().for_each(log_event);
        }
    }
    session.stop();

    let report = serde_json::json!({
        "seed": seed,
        "status": session.status(),
        "outcome": session.outcome(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
