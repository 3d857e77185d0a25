//! Tests for the webhook router.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use boardside::http::SessionList;
use boardside::{
    Analysis, DispatchSettings, Dispatcher, MoveOracle, OracleError, Reply, SearchBudget, router,
};
use boardside_chess::{Position, SessionRegistry};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

/// Plays the first legal move.
struct FirstLegalMove;

#[async_trait]
impl MoveOracle for FirstLegalMove {
    async fn best_move(
        &self,
        position: &Position,
        _budget: SearchBudget,
    ) -> Result<Analysis, OracleError> {
        let best_move = position
            .legal_moves()
            .first()
            .map(|mv| mv.uci())
            .ok_or_else(|| boardside::EngineError::new("no legal moves"))?;
        Ok(Analysis {
            best_move,
            score: None,
            pv: Vec::new(),
            depth: None,
        })
    }
}

fn app() -> axum::Router {
    let dispatcher = Dispatcher::new(
        SessionRegistry::new(),
        Arc::new(FirstLegalMove),
        None,
        DispatchSettings::default(),
    );
    router(Arc::new(dispatcher))
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body readable")
        .to_bytes()
        .to_vec()
}

fn event_request(conversation: &str, payload: &str) -> Request<Body> {
    let event = serde_json::json!({
        "conversation_id": conversation,
        "user_id": "u1",
        "kind": { "type": "button", "payload": payload }
    });
    Request::builder()
        .method("POST")
        .uri("/events")
        .header("content-type", "application/json")
        .body(Body::from(event.to_string()))
        .expect("valid request")
}

#[tokio::test]
async fn test_health() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("valid request"),
        )
        .await
        .expect("router answers");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"ok");
}

#[tokio::test]
async fn test_event_returns_reply() {
    let response = app()
        .oneshot(event_request("http-1", "side:white"))
        .await
        .expect("router answers");
    assert_eq!(response.status(), StatusCode::OK);

    let reply: Reply = serde_json::from_slice(&body_bytes(response).await).expect("reply JSON");
    assert!(reply.text.contains("Which white piece moved?"));
    assert!(reply.options.iter().any(|o| o.payload == "piece:knight"));
}

#[tokio::test]
async fn test_sessions_lists_conversations() {
    let app = app();
    for conversation in ["b-chat", "a-chat"] {
        app.clone()
            .oneshot(event_request(conversation, "side:white"))
            .await
            .expect("router answers");
    }

    let response = app
        .oneshot(
            Request::builder()
                .uri("/sessions")
                .body(Body::empty())
                .expect("valid request"),
        )
        .await
        .expect("router answers");
    let list: SessionList =
        serde_json::from_slice(&body_bytes(response).await).expect("session list JSON");
    assert_eq!(list.conversations, ["a-chat", "b-chat"]);
}

#[tokio::test]
async fn test_malformed_event_is_rejected() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/events")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"conversation_id": "x"}"#))
                .expect("valid request"),
        )
        .await
        .expect("router answers");

    assert!(response.status().is_client_error());
}
