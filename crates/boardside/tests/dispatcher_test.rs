//! Tests for the chat dispatcher with stand-in engines.

use async_trait::async_trait;
use boardside::{
    Analysis, ChatEvent, DispatchSettings, Dispatcher, EventKind, MoveOracle, OracleError, Reply,
    SearchBudget, SessionStore, describe,
};
use boardside_chess::{ConversationId, Position, SessionRegistry};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::NamedTempFile;

/// Always answers the same move and counts how often it was asked.
struct FixedOracle {
    reply: String,
    calls: AtomicUsize,
}

impl FixedOracle {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MoveOracle for FixedOracle {
    async fn best_move(
        &self,
        _position: &Position,
        _budget: SearchBudget,
    ) -> Result<Analysis, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Analysis {
            best_move: self.reply.clone(),
            score: None,
            pv: vec![self.reply.clone()],
            depth: Some(1),
        })
    }
}

/// Never answers in time.
struct SlowOracle;

#[async_trait]
impl MoveOracle for SlowOracle {
    async fn best_move(
        &self,
        _position: &Position,
        _budget: SearchBudget,
    ) -> Result<Analysis, OracleError> {
        Err(OracleError::timeout(Duration::from_millis(50)))
    }
}

fn dispatcher(oracle: Arc<dyn MoveOracle>, store: Option<SessionStore>) -> Dispatcher {
    Dispatcher::new(SessionRegistry::new(), oracle, store, DispatchSettings::default())
}

fn setup_test_store() -> (NamedTempFile, SessionStore) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();
    let store = SessionStore::open(db_path).expect("Failed to open store");
    (db_file, store)
}

async fn text(dispatcher: &Dispatcher, id: &str, text: &str) -> Reply {
    dispatcher
        .handle(ChatEvent::new(
            ConversationId::from(id),
            "user".to_string(),
            EventKind::Text {
                text: text.to_string(),
            },
        ))
        .await
}

async fn press(dispatcher: &Dispatcher, id: &str, payload: &str) -> Reply {
    dispatcher
        .handle(ChatEvent::new(
            ConversationId::from(id),
            "user".to_string(),
            EventKind::Button {
                payload: payload.to_string(),
            },
        ))
        .await
}

fn payloads(reply: &Reply) -> Vec<&str> {
    reply.options.iter().map(|o| o.payload.as_str()).collect()
}

async fn history(dispatcher: &Dispatcher, id: &str) -> Vec<String> {
    let session = dispatcher
        .registry()
        .acquire(&ConversationId::from(id))
        .expect("session is free");
    session.history().to_vec()
}

#[tokio::test]
async fn test_reported_move_gets_engine_reply() {
    let oracle = FixedOracle::new("e7e5");
    let dispatcher = dispatcher(oracle.clone(), None);

    let reply = text(&dispatcher, "c1", "/start").await;
    assert!(reply.text.starts_with(describe::WELCOME));
    assert_eq!(payloads(&reply), ["side:white", "side:black", "analyze"]);

    let reply = press(&dispatcher, "c1", "side:white").await;
    assert!(reply.text.contains("Which white piece moved?"));
    assert!(payloads(&reply).contains(&"piece:pawn"));

    let reply = press(&dispatcher, "c1", "piece:pawn").await;
    assert!(payloads(&reply).contains(&"square:e4"));
    assert_eq!(payloads(&reply).last(), Some(&"back"));

    let reply = press(&dispatcher, "c1", "square:e4").await;
    assert!(
        reply.text.starts_with(
            "Recorded: White pawn e2-e4.\n\nEngine suggests Black pawn e7-e5. Play it on your board."
        ),
        "unexpected reply: {}",
        reply.text
    );
    assert_eq!(payloads(&reply), ["side:white", "side:black", "analyze"]);
    assert_eq!(oracle.calls(), 1);
    assert_eq!(history(&dispatcher, "c1").await, ["e2e4", "e7e5"]);
}

#[tokio::test]
async fn test_typed_answers_work_like_buttons() {
    let dispatcher = dispatcher(FixedOracle::new("g8f6"), None);

    text(&dispatcher, "typed", "White").await;
    text(&dispatcher, "typed", "knight").await;
    let reply = text(&dispatcher, "typed", "f3").await;

    assert!(reply.text.starts_with("Recorded: White knight g1-f3."));
    assert_eq!(history(&dispatcher, "typed").await, ["g1f3", "g8f6"]);
}

#[tokio::test]
async fn test_suggestion_not_applied_when_disabled() {
    let settings = DispatchSettings::new(false, SearchBudget::default());
    let dispatcher = Dispatcher::new(
        SessionRegistry::new(),
        FixedOracle::new("e7e5"),
        None,
        settings,
    );

    for payload in ["side:white", "piece:pawn"] {
        press(&dispatcher, "manual", payload).await;
    }
    let reply = press(&dispatcher, "manual", "square:e4").await;

    assert!(reply.text.contains("Engine suggests Black pawn e7-e5."));
    assert!(!reply.text.contains("Play it on your board"));
    assert_eq!(history(&dispatcher, "manual").await, ["e2e4"]);
}

#[tokio::test]
async fn test_engine_timeout_keeps_position_and_offers_retry() {
    let dispatcher = dispatcher(Arc::new(SlowOracle), None);

    for payload in ["side:white", "piece:pawn"] {
        press(&dispatcher, "slow", payload).await;
    }
    let reply = press(&dispatcher, "slow", "square:e4").await;

    assert!(reply.text.contains("The engine took too long"));
    assert_eq!(
        payloads(&reply)
            .iter()
            .filter(|payload| **payload == "analyze")
            .count(),
        1
    );
    assert_eq!(history(&dispatcher, "slow").await, ["e2e4"]);

    let retry = press(&dispatcher, "slow", "analyze").await;
    assert!(retry.text.contains("The engine took too long"));
    assert_eq!(history(&dispatcher, "slow").await, ["e2e4"]);
}

#[tokio::test]
async fn test_wrong_destination_reprompts() {
    let dispatcher = dispatcher(FixedOracle::new("e7e5"), None);

    for payload in ["side:white", "piece:knight"] {
        press(&dispatcher, "wrong", payload).await;
    }
    let reply = press(&dispatcher, "wrong", "square:e4").await;

    assert!(reply.text.starts_with("No knight can move to e4."));
    assert!(payloads(&reply).contains(&"square:f3"));
    assert!(history(&dispatcher, "wrong").await.is_empty());
}

#[tokio::test]
async fn test_side_that_cannot_move_is_rejected() {
    let dispatcher = dispatcher(FixedOracle::new("e7e5"), None);

    text(&dispatcher, "check", "/fen 4k3/8/8/8/8/8/4r3/4K3 w - - 0 1").await;
    let reply = press(&dispatcher, "check", "side:black").await;

    assert!(reply.text.starts_with("Black can't be the side to move"));
    assert_eq!(payloads(&reply), ["side:white", "side:black", "analyze"]);
}

#[tokio::test]
async fn test_unrecognized_text_reprompts() {
    let dispatcher = dispatcher(FixedOracle::new("e7e5"), None);

    let reply = text(&dispatcher, "odd", "banana").await;
    assert!(reply.text.starts_with("I didn't understand 'banana'."));
    assert_eq!(payloads(&reply), ["side:white", "side:black", "analyze"]);
}

#[tokio::test]
async fn test_busy_session_rejects_event() {
    let dispatcher = dispatcher(FixedOracle::new("e7e5"), None);
    let id = ConversationId::from("busy");

    let _guard = dispatcher.registry().acquire(&id).expect("first holder");
    let reply = press(&dispatcher, "busy", "side:white").await;

    assert_eq!(reply.text, describe::BUSY);
}

#[tokio::test]
async fn test_photo_is_declined() {
    let dispatcher = dispatcher(FixedOracle::new("e7e5"), None);

    let reply = dispatcher
        .handle(ChatEvent::new(
            ConversationId::from("photo"),
            "user".to_string(),
            EventKind::Photo {
                file_id: "file-1".to_string(),
            },
        ))
        .await;

    assert_eq!(reply.text, describe::PHOTO_UNSUPPORTED);
    assert!(dispatcher.registry().is_empty());
}

#[tokio::test]
async fn test_set_position_and_bad_fen() {
    let dispatcher = dispatcher(FixedOracle::new("e7e5"), None);

    let reply = text(&dispatcher, "fen", "8/8/8/8/8/8/8/8 w - - 0 1").await;
    assert!(reply.text.starts_with("That position isn't valid."));

    let reply = text(&dispatcher, "fen", "4k3/8/8/8/8/8/8/R3K3 w - - 0 1").await;
    assert!(reply.text.starts_with("Position set."));
    assert!(reply.text.contains("FEN: 4k3/8/8/8/8/8/8/R3K3 w - - 0 1"));
}

#[tokio::test]
async fn test_checkmate_ends_game_without_engine_query() {
    let oracle = FixedOracle::new("e7e5");
    let (_db, store) = setup_test_store();
    let dispatcher = dispatcher(oracle.clone(), Some(store.clone()));

    text(
        &dispatcher,
        "mate",
        "/fen rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2",
    )
    .await;
    for payload in ["side:black", "piece:queen"] {
        press(&dispatcher, "mate", payload).await;
    }
    let reply = press(&dispatcher, "mate", "square:h4").await;

    assert!(reply.text.starts_with("Recorded: Black queen d8-h4."));
    assert!(reply.text.contains("Game over: checkmate, black wins (0-1)."));
    assert_eq!(payloads(&reply), ["new"]);
    assert_eq!(oracle.calls(), 0);

    let games = store
        .games_for(&ConversationId::from("mate"))
        .expect("Query failed");
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].result(), "0-1");
    assert_eq!(games[0].termination(), "checkmate");

    // Everything but a new game is answered with the result.
    let reply = press(&dispatcher, "mate", "side:white").await;
    assert!(reply.text.contains("Game over"));

    let reply = press(&dispatcher, "mate", "new").await;
    assert!(reply.text.starts_with("New game from the starting position."));
}

#[tokio::test]
async fn test_session_survives_restart() {
    let (_db, store) = setup_test_store();

    let first = dispatcher(FixedOracle::new("e7e5"), Some(store.clone()));
    for payload in ["side:white", "piece:knight"] {
        press(&first, "resume", payload).await;
    }
    drop(first);

    let second = dispatcher(FixedOracle::new("e7e5"), Some(store.clone()));
    let reply = press(&second, "resume", "square:f3").await;
    assert!(reply.text.starts_with("Recorded: White knight g1-f3."));

    let snapshot = store
        .load_snapshot(&ConversationId::from("resume"))
        .expect("Query failed")
        .expect("snapshot stored");
    assert_eq!(snapshot.moves, ["g1f3", "e7e5"]);
}

#[tokio::test]
async fn test_cancel_forgets_conversation() {
    let (_db, store) = setup_test_store();
    let dispatcher = dispatcher(FixedOracle::new("e7e5"), Some(store.clone()));
    let id = ConversationId::from("bye");

    press(&dispatcher, "bye", "side:white").await;
    assert!(store.load_snapshot(&id).expect("Query failed").is_some());

    let reply = text(&dispatcher, "bye", "/cancel").await;
    assert!(reply.text.starts_with("Game cancelled."));
    assert_eq!(payloads(&reply), ["new"]);
    assert!(!dispatcher.registry().contains(&id));
    assert!(store.load_snapshot(&id).expect("Query failed").is_none());

    let reply = text(&dispatcher, "bye", "/start").await;
    assert_eq!(payloads(&reply), ["side:white", "side:black", "analyze"]);
}

#[tokio::test]
async fn test_back_returns_to_previous_question() {
    let dispatcher = dispatcher(FixedOracle::new("e7e5"), None);

    for payload in ["side:white", "piece:knight"] {
        press(&dispatcher, "back", payload).await;
    }
    let reply = press(&dispatcher, "back", "back").await;
    assert!(reply.text.contains("Which white piece moved?"));

    let reply = press(&dispatcher, "back", "back").await;
    assert!(reply.text.starts_with("Who moved?"));
}
