use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use server_api::ApiContext;
use shared::{
    domain::ConnectionId,
    error::{ApiError, ErrorCode},
    protocol::{ClientRequest, GameSnapshot, MoveCall, MoveReceipt},
};
use storage::RoomStore;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;

use app_state::AppState;
use config::load_settings;

#[derive(Debug, Deserialize)]
struct SnapshotQuery {
    connection_id: ConnectionId,
}

const MAX_BODY_BYTES: usize = 16 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = load_settings();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .init();

    let api = ApiContext::new(RoomStore::new());
    let state = AppState { api };
    let app = build_router(Arc::new(state), &settings.allowed_origins);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .route("/rooms/:room_code", get(http_room_snapshot))
        .route("/rooms/:room_code/moves", post(http_submit_move))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::MalformedRequest => StatusCode::BAD_REQUEST,
        ErrorCode::SeatNotFound => StatusCode::FORBIDDEN,
        ErrorCode::RoomNotFound => StatusCode::NOT_FOUND,
        ErrorCode::NotInRoom
        | ErrorCode::RoomFull
        | ErrorCode::OutOfTurn
        | ErrorCode::MatchAlreadyDecided
        | ErrorCode::ColumnFull => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: ApiError) -> (StatusCode, Json<ApiError>) {
    debug!(code = ?error.code, message = %error.message, "call rejected");
    (status_for(error.code), Json(error))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_submit_move(
    State(state): State<Arc<AppState>>,
    Path(room_code): Path<String>,
    payload: Result<Json<MoveCall>, JsonRejection>,
) -> Result<Json<MoveReceipt>, (StatusCode, Json<ApiError>)> {
    let Json(call) = payload
        .map_err(|rejection| error_response(ApiError::malformed(rejection.body_text())))?;
    let receipt = server_api::submit_move_call(&state.api, &room_code, call)
        .await
        .map_err(error_response)?;
    Ok(Json(receipt))
}

async fn http_room_snapshot(
    State(state): State<Arc<AppState>>,
    Path(room_code): Path<String>,
    query: Result<Query<SnapshotQuery>, QueryRejection>,
) -> Result<Json<GameSnapshot>, (StatusCode, Json<ApiError>)> {
    let Query(q) = query
        .map_err(|rejection| error_response(ApiError::malformed(rejection.body_text())))?;
    let game = server_api::room_snapshot(&state.api, &room_code, q.connection_id)
        .await
        .map_err(error_response)?;
    Ok(Json(game))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket, ConnectionId::new()))
}

async fn ws_connection(state: Arc<AppState>, socket: WebSocket, connection_id: ConnectionId) {
    use futures::{SinkExt, StreamExt};

    let (mut sender, mut receiver) = socket.split();
    info!(%connection_id, "player connected");
    let mut events_rx = server_api::connect(&state.api, connection_id).await;

    let send_task = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(v) => v,
                Err(error) => {
                    warn!(%connection_id, %error, "failed to encode event");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Text(text) => dispatch_frame(&state, connection_id, &text).await,
            Message::Close(_) => break,
            _ => {}
        }
    }

    server_api::disconnect(&state.api, connection_id).await;
    info!(%connection_id, "player disconnected");
    send_task.abort();
}

async fn dispatch_frame(state: &AppState, connection_id: ConnectionId, text: &str) {
    let request = match serde_json::from_str::<ClientRequest>(text) {
        Ok(request) => request,
        Err(error) => {
            server_api::reject(
                &state.api,
                connection_id,
                ApiError::malformed(format!("invalid request: {error}")),
            )
            .await;
            return;
        }
    };
    let _ = server_api::handle_request(&state.api, connection_id, request).await;
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
