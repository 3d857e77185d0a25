//! HTTP webhook adapter.
//!
//! `POST /events` takes a [`ChatEvent`] as JSON and answers with the
//! [`Reply`]. `GET /sessions` lists live conversations and `GET /health`
//! answers `ok`.

use crate::chat::{ChatEvent, Reply};
use crate::dispatcher::Dispatcher;
use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::Request,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::{debug, info, instrument};

/// Body of `GET /sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionList {
    /// Live conversation ids, sorted.
    pub conversations: Vec<String>,
}

/// Builds the webhook router.
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", post(handle_event))
        .route("/sessions", get(list_sessions))
        .layer(ServiceBuilder::new().map_request(|req: Request<Body>| {
            info!(
                method = %req.method(),
                uri = %req.uri(),
                "Incoming HTTP request"
            );
            req
        }))
        .with_state(dispatcher)
}

/// Serves the webhook until the process is stopped.
#[instrument(skip(dispatcher))]
pub async fn serve(dispatcher: Arc<Dispatcher>, host: &str, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!("Webhook ready at http://{}:{}/events", host, port);
    axum::serve(listener, router(dispatcher)).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

#[instrument(skip(dispatcher, event), fields(conversation_id = %event.conversation_id))]
async fn handle_event(
    State(dispatcher): State<Arc<Dispatcher>>,
    Json(event): Json<ChatEvent>,
) -> Json<Reply> {
    let reply = dispatcher.handle(event).await;
    debug!(options = reply.options.len(), "Replying");
    Json(reply)
}

async fn list_sessions(State(dispatcher): State<Arc<Dispatcher>>) -> Json<SessionList> {
    let conversations = dispatcher
        .registry()
        .conversation_ids()
        .into_iter()
        .map(|id| id.to_string())
        .collect();
    Json(SessionList { conversations })
}
