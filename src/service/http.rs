//! HTTP API for the ladder
//!
//! JSON endpoints for registering competitors, recording matches and reading
//! the scoreboard, plus health and Prometheus metrics endpoints, built on Axum.

use crate::error::{LadderError, MatchRole};
use crate::service::ladder::LadderService;
use crate::types::{CompetitorId, MatchReport, MatchRequest, NewCompetitorRequest};
use crate::utils::current_timestamp;
use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct ApiState {
    pub ladder: Arc<LadderService>,
    pub service_name: String,
}

impl ApiState {
    pub fn new(ladder: Arc<LadderService>, service_name: impl Into<String>) -> Self {
        Self {
            ladder,
            service_name: service_name.into(),
        }
    }
}

/// Create the Axum router with all ladder endpoints
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/player", post(add_player_handler))
        .route("/player/{id}", get(get_player_handler))
        .route("/match", post(record_match_handler))
        .route("/scoreboard", get(scoreboard_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Bind `addr` and serve the API until `shutdown` resolves
pub async fn serve<F>(addr: &str, state: ApiState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = addr.parse().context("Invalid HTTP listen address")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP API listening on http://{}", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP API stopped");
    Ok(())
}

/// Error wrapper translating ladder errors into HTTP responses
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0.downcast_ref::<LadderError>() {
            Some(LadderError::CompetitorNotFound { .. }) => {
                (StatusCode::NOT_FOUND, "Competitor not found".to_string())
            }
            Some(LadderError::MatchParticipantNotFound { role, .. }) => {
                let message = match role {
                    MatchRole::Winner => "Winner ID does not exist.",
                    MatchRole::Loser => "Loser ID does not exist.",
                };
                (StatusCode::NOT_FOUND, message.to_string())
            }
            Some(LadderError::InvalidRequest { reason }) => {
                (StatusCode::BAD_REQUEST, reason.clone())
            }
            Some(LadderError::CapacityExceeded { .. }) => {
                (StatusCode::CONFLICT, self.0.to_string())
            }
            _ => {
                error!("Request failed: {:#}", self.0);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

async fn root_handler() -> &'static str {
    "Elo Rating System"
}

async fn get_player_handler(
    State(state): State<ApiState>,
    Path(id): Path<CompetitorId>,
) -> Result<impl IntoResponse, ApiError> {
    let competitor = state.ladder.get_competitor(id).await?;

    Ok(Json(json!({
        "id": competitor.id,
        "name": competitor.name,
        "rating": competitor.rating,
        "games_played": competitor.games_played,
    })))
}

async fn add_player_handler(
    State(state): State<ApiState>,
    Json(request): Json<NewCompetitorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = request.name.unwrap_or_default();
    let competitor = state.ladder.add_competitor(&name).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Competitor {} added.", competitor.name),
            "id": competitor.id,
            "rating": competitor.rating,
        })),
    ))
}

async fn record_match_handler(
    State(state): State<ApiState>,
    Json(request): Json<MatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    debug!(
        "Match reported - winner {}, loser {}",
        request.winner_id, request.loser_id
    );

    let report = state
        .ladder
        .record_match(request.winner_id, request.loser_id)
        .await?;

    let body = match report {
        MatchReport::WinLoss { winner, loser } => json!({
            "outcome": "win_loss",
            "winner_new_rating": winner.new_rating,
            "loser_new_rating": loser.new_rating,
        }),
        MatchReport::Tie { competitor } => json!({
            "outcome": "tie",
            "message": "Match ended in a tie. Ratings updated.",
            "rating": competitor.new_rating,
        }),
    };

    Ok(Json(body))
}

async fn scoreboard_handler(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let board = state.ladder.scoreboard().await?;
    Ok(Json(board))
}

/// Lightweight health check endpoint handler
async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    debug!("Health check requested");

    match state.ladder.competitor_count().await {
        Ok(competitors) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "service": state.service_name,
                "version": env!("CARGO_PKG_VERSION"),
                "competitors": competitors,
                "rating": state.ladder.rating_config(),
                "timestamp": current_timestamp(),
            })),
        ),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": state.service_name,
                    "version": env!("CARGO_PKG_VERSION"),
                    "timestamp": current_timestamp(),
                })),
            )
        }
    }
}

/// Prometheus metrics endpoint handler
async fn metrics_handler(State(state): State<ApiState>) -> Response {
    match state.ladder.metrics().encode() {
        Ok(output) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            output,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics".to_string(),
            )
                .into_response()
        }
    }
}
