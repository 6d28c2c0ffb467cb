//! HTTP difficulty service
//!
//! Exposes the rule engine over `POST /api/player/update` and keeps a
//! bounded history of processed updates for the listing endpoints.

mod handlers;
pub mod store;
pub mod validation;

use std::env;
use std::net::TcpListener;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, dev::Server, error::InternalError, http::StatusCode, middleware, web};

use handlers::{get_player, health, index, json_error, list_players, update_player};
use store::PlayerStore;

pub const SERVICE_NAME: &str = "lane-dash-difficulty";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_MAX_RECORDS: usize = 500;
/// Records returned by `GET /api/player`
pub const PLAYER_LIST_LIMIT: usize = 50;
const JSON_LIMIT_BYTES: usize = 16 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_records: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_records: DEFAULT_MAX_RECORDS,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            max_records: read_env_usize("MAX_RECORDS", DEFAULT_MAX_RECORDS),
        }
    }
}

pub(crate) fn read_env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

#[derive(Clone)]
pub struct AppState {
    pub players: Arc<PlayerStore>,
}

impl AppState {
    pub fn new(max_records: usize) -> Self {
        Self {
            players: Arc::new(PlayerStore::new(max_records)),
        }
    }
}

/// Register the service routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/health", web::get().to(health))
        .route("/api/player/update", web::post().to(update_player))
        .route("/api/player", web::get().to(list_players))
        .route("/api/player/{id}", web::get().to(get_player));
}

/// Body limit plus JSON-shaped errors for unparseable bodies
pub(crate) fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT_BYTES)
        .error_handler(|err, _req| {
            let message = format!("Invalid JSON body: {err}");
            InternalError::from_response(err, json_error(StatusCode::BAD_REQUEST, message)).into()
        })
}

/// Start serving on an already-bound listener
pub fn serve(listener: TcpListener, state: AppState) -> std::io::Result<Server> {
    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(json_config())
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .listen(listener)?
    .run();
    Ok(server)
}

/// Bind `config.bind_addr` and run until shutdown
pub async fn run(config: ServerConfig) -> std::io::Result<()> {
    log::info!(
        "starting {}: bind_addr={} max_records={}",
        SERVICE_NAME,
        config.bind_addr,
        config.max_records
    );
    let listener = TcpListener::bind(&config.bind_addr)?;
    serve(listener, AppState::new(config.max_records))?.await
}
