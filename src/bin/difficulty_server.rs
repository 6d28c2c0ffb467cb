//! Difficulty service binary
//!
//! Configuration comes from the environment (`BIND_ADDR`, `MAX_RECORDS`);
//! `--bind` takes precedence over `BIND_ADDR`.

use clap::Parser;
use lane_dash::server::{self, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "difficulty-server")]
#[command(about = "Rule-based difficulty service for Lane Dash")]
struct Cli {
    /// Address to listen on
    #[arg(long)]
    bind: Option<String>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = ServerConfig::from_env();
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }
    server::run(config).await
}
