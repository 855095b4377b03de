//! HTTP route definitions

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, error};

use crate::app::AppState;
use crate::store::{BestGameRow, LeaderboardRow, PlayerStats, RenameTarget, ScoreRecord, StoreError};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/score", post(score_handler))
        .route("/rename", post(rename_handler))
        .route("/leaderboard", get(leaderboard_handler))
        .route("/leaderboard/best", get(best_games_handler))
        .route("/leaderboard/today", get(leaderboard_today_handler))
        .route("/player/:username", get(player_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.client_origins))
        .with_state(state)
}

/// Listed origins only when configured, any origin otherwise
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    if allowed.is_empty() {
        base.allow_origin(Any)
    } else {
        base.allow_origin(allowed)
    }
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_matches: usize,
    active_players: usize,
    store: &'static str,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_matches: state.match_registry.active_matches(),
        active_players: state.match_registry.total_players(),
        store: state.store.backend(),
    })
}

// ============================================================================
// Score endpoints
// ============================================================================

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<i64>,
}

async fn leaderboard_handler(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<LeaderboardRow>>, AppError> {
    Ok(Json(state.store.leaderboard(query.limit).await?))
}

async fn leaderboard_today_handler(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<LeaderboardRow>>, AppError> {
    Ok(Json(state.store.leaderboard_today(query.limit).await?))
}

async fn best_games_handler(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<BestGameRow>>, AppError> {
    Ok(Json(state.store.best_games(query.limit).await?))
}

async fn player_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<PlayerStats>, AppError> {
    state
        .store
        .player_stats(&username)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Player not found".to_string()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoreRequest {
    username: String,
    xp: u32,
    #[serde(default)]
    player_id: Option<String>,
    #[serde(default)]
    kills: u32,
    #[serde(default)]
    hits: u32,
    #[serde(default)]
    torpedoes_fired: u32,
    #[serde(default)]
    placement: u32,
    #[serde(default)]
    won: bool,
    #[serde(default)]
    game_time: f32,
}

#[derive(Serialize)]
struct ScoreResponse {
    id: i64,
    xp: u32,
}

/// Out-of-band score submission; match results are recorded by the server itself
async fn score_handler(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ScoreRequest>,
) -> Result<Json<ScoreResponse>, AppError> {
    let xp = req.xp;
    let id = state
        .store
        .record(ScoreRecord {
            username: req.username,
            player_id: req.player_id.unwrap_or_default(),
            xp,
            kills: req.kills,
            hits: req.hits,
            torpedoes_fired: req.torpedoes_fired,
            placement: req.placement,
            won: req.won,
            game_time: req.game_time,
        })
        .await?;

    Ok(Json(ScoreResponse { id, xp }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameRequest {
    player_id: Option<String>,
    old_name: Option<String>,
    #[serde(default)]
    new_name: String,
}

#[derive(Serialize)]
struct RenameResponse {
    updated: u64,
}

async fn rename_handler(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RenameRequest>,
) -> Result<Json<RenameResponse>, AppError> {
    let target = RenameTarget::from_request(req.player_id.as_deref(), req.old_name.as_deref())?;
    let updated = state.store.rename(target, &req.new_name).await?;
    Ok(Json(RenameResponse { updated }))
}

// ============================================================================
// Error handling
// ============================================================================

/// JSON request body; a bad body is answered like every other error
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
struct JsonBody<T>(T);

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidName | StoreError::MissingIdentity => AppError::BadRequest(e.to_string()),
            StoreError::Supabase(inner) => {
                error!(error = %inner, "Score store request failed");
                AppError::Internal("Score store unavailable".to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection, "Rejected request body");
        AppError::BadRequest("Invalid data".to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
