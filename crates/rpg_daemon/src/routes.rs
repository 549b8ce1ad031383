use crate::state::{AppState, StreamMessage};
use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{
        sse::{Event, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use rpg_core::Action;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[cfg(test)]
pub fn make_router(state: AppState) -> Router {
    make_router_with_cors(state, HeaderValue::from_static("http://localhost:5173"))
}

pub fn make_router_with_cors(state: AppState, cors_origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/meta", get(meta_handler))
        .route("/api/v1/state", get(state_handler))
        .route("/api/v1/notices", get(notices_handler))
        .route("/api/v1/notices/dismiss", post(dismiss_handler))
        .route("/api/v1/refresh", post(refresh_handler))
        .route("/api/v1/actions", post(action_handler))
        .route("/api/v1/stream", get(stream_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn meta_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let session = app_state.session.lock();
    Json(serde_json::json!({
        "content_version": session.content().content_version,
        "skills": session.content().skills.len(),
        "last_update": session.state().last_update,
        "vault": app_state.vault.display().to_string(),
    }))
}

pub async fn state_handler(
    State(app_state): State<AppState>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let session = app_state.session.lock();
    let body = serde_json::to_string(session.state());
    drop(session);
    match body {
        Ok(json) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            json,
        ),
        Err(err) => {
            tracing::error!("state serialization failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/json")],
                r#"{"error":"serialization failed"}"#.to_string(),
            )
        }
    }
}

pub async fn notices_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let session = app_state.session.lock();
    Json(serde_json::json!({ "notices": session.notices() }))
}

#[derive(Deserialize)]
pub struct DismissRequest {
    pub id: u64,
}

pub async fn dismiss_handler(
    State(app_state): State<AppState>,
    Json(request): Json<DismissRequest>,
) -> Json<serde_json::Value> {
    let dismissed = app_state.session.lock().dismiss(request.id);
    Json(serde_json::json!({ "dismissed": dismissed }))
}

/// Queues a vault re-read. Requests arriving while one is already queued
/// fold into it.
pub async fn refresh_handler(
    State(app_state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    match app_state.refresh_tx.try_send(()) {
        Ok(()) | Err(tokio::sync::mpsc::error::TrySendError::Full(())) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "queued": true })),
        ),
        Err(tokio::sync::mpsc::error::TrySendError::Closed(())) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "refresh loop stopped" })),
        ),
    }
}

pub async fn action_handler(
    State(app_state): State<AppState>,
    Json(action): Json<Action>,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut session = app_state.session.lock();
    let notices_before = session.notices().len();
    let result = session.apply(&action, rpg_world::now_ms());
    let last_update = session.state().last_update;
    let fresh = session.notices()[notices_before.min(session.notices().len())..].to_vec();
    drop(session);

    match result {
        Ok(events) => {
            let body = serde_json::json!({ "events": &events });
            if !events.is_empty() {
                let _ = app_state.event_tx.send(StreamMessage::Events { events });
            }
            let _ = app_state
                .event_tx
                .send(StreamMessage::StateChanged { last_update });
            if !fresh.is_empty() {
                let _ = app_state
                    .event_tx
                    .send(StreamMessage::Notices { notices: fresh });
            }
            (StatusCode::OK, Json(body))
        }
        Err(rejection) => {
            tracing::debug!(?action, %rejection, "action rejected");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({ "error": rejection.to_string(), "rejection": rejection })),
            )
        }
    }
}

pub async fn stream_handler(
    State(app_state): State<AppState>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.event_tx.subscribe();
    let session = app_state.session.clone();

    let stream = async_stream::stream! {
        let mut heartbeat = tokio::time::interval(Duration::from_secs(5));
        heartbeat.tick().await; // discard the immediate first tick
        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(message) => {
                            let data = serde_json::to_string(&message).unwrap_or_default();
                            yield Ok(Event::default().data(data));
                        }
                        // A lagging client only missed deltas; point it at the latest state.
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "stream subscriber lagged");
                            let last_update = session.lock().state().last_update;
                            let resync = StreamMessage::StateChanged { last_update };
                            let data = serde_json::to_string(&resync).unwrap_or_default();
                            yield Ok(Event::default().data(data));
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = heartbeat.tick() => {
                    let last_update = session.lock().state().last_update;
                    let hb = serde_json::json!({"heartbeat": true, "last_update": last_update});
                    yield Ok(Event::default().data(hb.to_string()));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}
