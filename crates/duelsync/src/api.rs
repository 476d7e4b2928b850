//! HTTP API.
//!
//! Thin axum handlers over [`Services`]: parse, call, map errors. Every
//! error body has the same shape:
//!
//! ```json
//! { "code": 409, "error": "version_conflict", "message": "...", "current": { ... } }
//! ```
//!
//! `current` is only present on a version conflict.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use duelsync_match::{
    CreateMatch, LobbyStatus, MatchError, MatchPatch, MatchmakingStatus,
};
use duelsync_protocol::{
    DeckId, GameState, MatchSnapshot, MatchStatus, PlayerId, ProtocolError,
    RoomCode,
};
use duelsync_quickroom::{
    CreateQuickRoom, QuickRoom, QuickRoomError, QuickRoomStatus,
};
use duelsync_store::MatchRecord;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::{Backend, Services};

type AppState<B> = State<Arc<Services<B>>>;
type Body<T> = Result<Json<T>, JsonRejection>;

/// Builds the API router.
pub fn router<B: Backend>(services: Arc<Services<B>>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/matches", post(create_match::<B>))
        .route(
            "/api/matches/:code",
            get(get_match::<B>).patch(patch_match::<B>),
        )
        .route("/api/matches/:code/join", post(join_match::<B>))
        .route("/api/matches/:code/cancel", post(cancel_match::<B>))
        .route("/api/matchmaking", post(matchmaking_create::<B>))
        .route("/api/matchmaking/:code", get(matchmaking_status::<B>))
        .route("/api/matchmaking/:code/join", post(matchmaking_join::<B>))
        .route(
            "/api/lobby/:code",
            post(lobby_join::<B>).get(lobby_status::<B>),
        )
        .route("/api/quick-rooms", post(create_quick_room::<B>))
        .route(
            "/api/quick-rooms/:id",
            get(get_quick_room::<B>)
                .patch(patch_quick_room::<B>)
                .delete(delete_quick_room::<B>),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(services)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// An error rendered as a JSON response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
    current: Option<MatchSnapshot>,
}

impl ApiError {
    fn new(code: u16, kind: &'static str, message: String) -> Self {
        Self {
            status: StatusCode::from_u16(code)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            kind,
            message,
            current: None,
        }
    }
}

impl From<MatchError> for ApiError {
    fn from(err: MatchError) -> Self {
        let mut api = Self::new(err.status_code(), err.kind(), err.to_string());
        if let MatchError::VersionConflict { current, .. } = err {
            api.current = Some(*current);
        }
        api
    }
}

impl From<QuickRoomError> for ApiError {
    fn from(err: QuickRoomError) -> Self {
        Self::new(err.status_code(), err.kind(), err.to_string())
    }
}

impl From<ProtocolError> for ApiError {
    fn from(err: ProtocolError) -> Self {
        MatchError::from(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(400, "validation", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::warn!(status = %self.status, error = self.kind, message = %self.message, "request failed");
        } else {
            tracing::debug!(status = %self.status, error = self.kind, message = %self.message, "request rejected");
        }

        let mut body = json!({
            "code": self.status.as_u16(),
            "error": self.kind,
            "message": self.message,
        });
        if let Some(current) = self.current {
            body["current"] = json!(current);
        }
        (self.status, Json(body)).into_response()
    }
}

fn room_code(raw: &str) -> Result<RoomCode, ApiError> {
    Ok(RoomCode::parse(raw)?)
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PatchBody {
    expected_version: u64,
    #[serde(default, alias = "partial_state")]
    state: GameState,
    #[serde(default)]
    status: Option<MatchStatus>,
}

#[derive(Debug, Deserialize)]
struct JoinBody {
    player_id: PlayerId,
    #[serde(default)]
    deck_id: Option<DeckId>,
}

#[derive(Debug, Deserialize)]
struct SeatBody {
    player_id: PlayerId,
    deck_id: DeckId,
}

#[derive(Debug, Deserialize)]
struct MatchmakingBody {
    player_id: PlayerId,
    deck_id: DeckId,
    #[serde(default)]
    room_id: Option<RoomCode>,
}

#[derive(Debug, Deserialize)]
struct QuickRoomPatch {
    status: QuickRoomStatus,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn healthz() -> &'static str {
    "ok"
}

async fn create_match<B: Backend>(
    State(services): AppState<B>,
    body: Body<CreateMatch>,
) -> Result<(StatusCode, Json<MatchRecord>), ApiError> {
    let Json(request) = body?;
    let record = services.coordinator.create(request).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_match<B: Backend>(
    State(services): AppState<B>,
    Path(code): Path<String>,
) -> Result<Json<MatchSnapshot>, ApiError> {
    let room = room_code(&code)?;
    Ok(Json(services.coordinator.get(&room).await?))
}

async fn patch_match<B: Backend>(
    State(services): AppState<B>,
    Path(code): Path<String>,
    body: Body<PatchBody>,
) -> Result<Json<MatchSnapshot>, ApiError> {
    let room = room_code(&code)?;
    let Json(body) = body?;
    let patch = MatchPatch {
        state: body.state,
        status: body.status,
    };
    let snapshot = services
        .coordinator
        .patch(&room, body.expected_version, patch)
        .await?;
    Ok(Json(snapshot))
}

async fn join_match<B: Backend>(
    State(services): AppState<B>,
    Path(code): Path<String>,
    body: Body<JoinBody>,
) -> Result<Json<MatchRecord>, ApiError> {
    let room = room_code(&code)?;
    let Json(body) = body?;
    let record = services
        .coordinator
        .join(&room, body.player_id, body.deck_id)
        .await?;
    Ok(Json(record))
}

async fn cancel_match<B: Backend>(
    State(services): AppState<B>,
    Path(code): Path<String>,
) -> Result<Json<MatchRecord>, ApiError> {
    let room = room_code(&code)?;
    Ok(Json(services.coordinator.cancel(&room).await?))
}

async fn matchmaking_create<B: Backend>(
    State(services): AppState<B>,
    body: Body<MatchmakingBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(body) = body?;
    let record = services
        .matchmaker
        .create(body.player_id, body.deck_id, body.room_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "room_id": record.room, "match": record })),
    ))
}

async fn matchmaking_join<B: Backend>(
    State(services): AppState<B>,
    Path(code): Path<String>,
    body: Body<SeatBody>,
) -> Result<Json<MatchRecord>, ApiError> {
    let room = room_code(&code)?;
    let Json(body) = body?;
    let record = services
        .matchmaker
        .join(&room, body.player_id, body.deck_id)
        .await?;
    Ok(Json(record))
}

async fn matchmaking_status<B: Backend>(
    State(services): AppState<B>,
    Path(code): Path<String>,
) -> Result<Json<MatchmakingStatus>, ApiError> {
    let room = room_code(&code)?;
    Ok(Json(services.matchmaker.status(&room).await?))
}

async fn lobby_join<B: Backend>(
    State(services): AppState<B>,
    Path(code): Path<String>,
    body: Body<SeatBody>,
) -> Result<Json<LobbyStatus>, ApiError> {
    let room = room_code(&code)?;
    let Json(body) = body?;
    let status = services
        .lobby
        .join_or_create(&room, body.player_id, body.deck_id)
        .await?;
    Ok(Json(status))
}

async fn lobby_status<B: Backend>(
    State(services): AppState<B>,
    Path(code): Path<String>,
) -> Result<Json<LobbyStatus>, ApiError> {
    let room = room_code(&code)?;
    Ok(Json(services.lobby.status(&room).await?))
}

async fn create_quick_room<B: Backend>(
    State(services): AppState<B>,
    body: Body<CreateQuickRoom>,
) -> Result<(StatusCode, Json<QuickRoom>), ApiError> {
    let Json(request) = body?;
    let room = services.quick_rooms.create(request).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

async fn get_quick_room<B: Backend>(
    State(services): AppState<B>,
    Path(id): Path<String>,
) -> Result<Json<QuickRoom>, ApiError> {
    Ok(Json(services.quick_rooms.get(&id).await?))
}

async fn patch_quick_room<B: Backend>(
    State(services): AppState<B>,
    Path(id): Path<String>,
    body: Body<QuickRoomPatch>,
) -> Result<Json<QuickRoom>, ApiError> {
    let Json(body) = body?;
    Ok(Json(services.quick_rooms.patch(&id, body.status).await?))
}

async fn delete_quick_room<B: Backend>(
    State(services): AppState<B>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    services.quick_rooms.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
