//! Request handlers for the difficulty service

use actix_web::{
    HttpResponse, Responder,
    http::StatusCode,
    web::{Data, Json, Path},
};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::store::PlayerRecord;
use super::validation::{REQUIRED_FIELDS, ValidationError, validate_player_data};
use super::{AppState, PLAYER_LIST_LIMIT, SERVICE_NAME};
use crate::difficulty::{DifficultyTier, TrendAnalysis, analyze_trends, calculate_difficulty};
use crate::feedback::WireSettings;

pub(crate) fn json_error(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({
        "success": false,
        "error": message.into(),
    }))
}

fn validation_error(err: &ValidationError) -> HttpResponse {
    let mut body = serde_json::json!({
        "success": false,
        "error": err.to_string(),
        "message": err.detail(),
    });
    if *err == ValidationError::MissingFields {
        body["required"] = serde_json::json!(REQUIRED_FIELDS);
    }
    HttpResponse::BadRequest().json(body)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    success: bool,
    player_id: Uuid,
    difficulty: DifficultyTier,
    settings: WireSettings,
    message: String,
}

#[derive(Serialize)]
struct PlayerResponse {
    player: PlayerRecord,
    settings: WireSettings,
}

#[derive(Serialize, Default)]
struct DifficultyDistribution {
    easy: usize,
    medium: usize,
    hard: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Analytics {
    total_players: usize,
    trends: TrendAnalysis,
    difficulty_distribution: DifficultyDistribution,
}

#[derive(Serialize)]
struct PlayerListResponse {
    players: Vec<PlayerRecord>,
    analytics: Analytics,
}

pub(crate) async fn index() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Difficulty engine running",
        "service": SERVICE_NAME,
    }))
}

pub(crate) async fn health(state: Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "storedPlayers": state.players.len(),
    }))
}

pub(crate) async fn update_player(state: Data<AppState>, body: Json<Value>) -> impl Responder {
    let request = match validate_player_data(&body) {
        Ok(request) => request,
        Err(e) => {
            log::warn!("Rejected player update: {}", e);
            return validation_error(&e);
        }
    };

    let difficulty = calculate_difficulty(&request.into());
    let record = PlayerRecord::new(&request, difficulty);
    let player_id = record.id;
    state.players.insert(record);
    log::debug!("Player {} -> {}", player_id, difficulty);

    HttpResponse::Ok().json(UpdateResponse {
        success: true,
        player_id,
        difficulty,
        settings: difficulty.settings().into(),
        message: format!("Difficulty adjusted to {}", difficulty),
    })
}

pub(crate) async fn get_player(state: Data<AppState>, path: Path<String>) -> impl Responder {
    let raw = path.into_inner();
    let Some(player) = Uuid::parse_str(&raw).ok().and_then(|id| state.players.get(id)) else {
        return json_error(StatusCode::NOT_FOUND, "Player not found");
    };
    let settings = player.difficulty.settings().into();
    HttpResponse::Ok().json(PlayerResponse { player, settings })
}

pub(crate) async fn list_players(state: Data<AppState>) -> impl Responder {
    let players = state.players.latest(PLAYER_LIST_LIMIT);

    let mut distribution = DifficultyDistribution::default();
    for p in &players {
        match p.difficulty {
            DifficultyTier::Easy => distribution.easy += 1,
            DifficultyTier::Medium => distribution.medium += 1,
            DifficultyTier::Hard => distribution.hard += 1,
        }
    }
    // Oldest first for trend analysis
    let history: Vec<_> = players.iter().rev().map(PlayerRecord::snapshot).collect();

    HttpResponse::Ok().json(PlayerListResponse {
        analytics: Analytics {
            total_players: players.len(),
            trends: analyze_trends(&history),
            difficulty_distribution: distribution,
        },
        players,
    })
}
