//! Routes chat events to sessions, the resolver and the engine.

use crate::chat::{ChatCommand, ChatEvent, Reply};
use crate::config::BoardsideConfig;
use crate::db::{DbError, NewGameRecord, SessionStore};
use crate::describe::{self, stage_prompt};
use crate::engine::{MoveOracle, OracleError, SearchBudget};
use boardside_chess::{
    CandidateMove, ConversationId, GameError, GameOutcome, GameSession, ResolverInput,
    ResolverStage, SessionRegistry,
};
use derive_getters::Getters;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Behaviour switches for the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, derive_new::new)]
pub struct DispatchSettings {
    /// Apply the engine's move to the board after suggesting it.
    apply_suggestion: bool,
    /// Search limits for every engine query.
    budget: SearchBudget,
}

impl DispatchSettings {
    /// Settings from the `[engine]` and `[game]` config sections.
    pub fn from_config(config: &BoardsideConfig) -> Self {
        let engine = config.engine();
        Self::new(
            *config.game().apply_suggestion(),
            SearchBudget::new(engine.movetime(), *engine.depth()),
        )
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::new(true, SearchBudget::default())
    }
}

/// Handles one chat event at a time per conversation.
///
/// Cheap to share behind an [`Arc`]; every adapter calls [`Dispatcher::handle`].
pub struct Dispatcher {
    registry: SessionRegistry,
    oracle: Arc<dyn MoveOracle>,
    store: Option<SessionStore>,
    settings: DispatchSettings,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("sessions", &self.registry.len())
            .field("store", &self.store)
            .field("settings", &self.settings)
            .finish()
    }
}

impl Dispatcher {
    /// Creates a dispatcher.
    pub fn new(
        registry: SessionRegistry,
        oracle: Arc<dyn MoveOracle>,
        store: Option<SessionStore>,
        settings: DispatchSettings,
    ) -> Self {
        info!(persistent = store.is_some(), ?settings, "Creating dispatcher");
        Self {
            registry,
            oracle,
            store,
            settings,
        }
    }

    /// Live sessions.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Handles one event and returns the reply to send.
    ///
    /// Never fails: every problem becomes a reply the user can act on.
    #[instrument(skip(self, event), fields(conversation_id = %event.conversation_id, user_id = %event.user_id))]
    pub async fn handle(&self, event: ChatEvent) -> Reply {
        let id = event.conversation_id;
        let command = ChatCommand::parse(&event.kind);
        debug!(?command, "Handling event");

        match command {
            ChatCommand::Help => return Reply::text(describe::HELP),
            ChatCommand::Photo => return Reply::text(describe::PHOTO_UNSUPPORTED),
            _ => {}
        }

        if let Err(e) = self.ensure_session(&id).await {
            error!(error = %e, "Could not load stored session");
            return Reply::text(describe::TRY_AGAIN);
        }

        let mut session = match self.registry.acquire(&id) {
            Ok(session) => session,
            Err(e) => return Reply::text(describe::error_text(&e)),
        };

        if command == ChatCommand::Cancel {
            self.registry.remove(&id);
            if let Some(store) = self.store.clone() {
                let forget = id.clone();
                if let Err(e) = run_blocking(move || store.delete_snapshot(&forget)).await {
                    error!(error = %e, "Could not delete stored session");
                }
            }
            info!("Conversation cancelled");
            return Reply::text("Game cancelled. Send /new to start again.")
                .with_options([describe::new_game_option()]);
        }

        let reply = self.apply(&mut session, command).await;
        self.persist(&session).await;
        reply
    }

    async fn apply(&self, session: &mut GameSession, command: ChatCommand) -> Reply {
        let input = match command {
            ChatCommand::Start => return stage_prompt(session).prefixed(describe::WELCOME),
            ChatCommand::NewGame => {
                session.restart();
                return stage_prompt(session).prefixed("New game from the starting position.");
            }
            ChatCommand::SetPosition(position) => {
                session.restart_from(position);
                let board = describe::board_text(session.position());
                return stage_prompt(session).prefixed(format!("Position set.\n\n{}", board));
            }
            ChatCommand::BadPosition(fen) => {
                let error = GameError::InvalidPosition { reason: fen };
                return stage_prompt(session).prefixed(describe::error_text(&error));
            }
            ChatCommand::Board => {
                let board = describe::board_text(session.position());
                return stage_prompt(session).prefixed(board);
            }
            ChatCommand::Analyze => return self.engine_turn(session).await,
            ChatCommand::Back => {
                session.resolver().back();
                return stage_prompt(session);
            }
            ChatCommand::Side(side) => ResolverInput::Side(side),
            ChatCommand::Piece(piece) => ResolverInput::Piece(piece),
            ChatCommand::Square(square) => ResolverInput::Destination(square),
            ChatCommand::Move(uci) => ResolverInput::Candidate(uci),
            ChatCommand::Answer(text) => match ResolverInput::parse_for(&session.stage(), &text) {
                Some(input) => input,
                None => {
                    let error = GameError::UnexpectedInput {
                        expected: session.stage(),
                        input: text,
                    };
                    warn!(error = %error, "Unrecognized answer");
                    return stage_prompt(session).prefixed(describe::error_text(&error));
                }
            },
            // Handled before the session is locked.
            ChatCommand::Help | ChatCommand::Photo | ChatCommand::Cancel => {
                return stage_prompt(session);
            }
        };

        self.resolve(session, input).await
    }

    #[instrument(skip(self, session, input), fields(stage = %session.stage(), input = %input))]
    async fn resolve(&self, session: &mut GameSession, input: ResolverInput) -> Reply {
        let result = session.resolver().submit(input);
        match result {
            Ok(ResolverStage::Resolved(mv)) => self.commit(session, mv).await,
            Ok(stage) => {
                debug!(%stage, "Advanced");
                stage_prompt(session)
            }
            Err(e) => {
                debug!(error = %e, stage = %session.stage(), "Re-prompting");
                stage_prompt(session).prefixed(describe::error_text(&e))
            }
        }
    }

    async fn commit(&self, session: &mut GameSession, mv: CandidateMove) -> Reply {
        if let Err(e) = session.commit(&mv) {
            warn!(error = %e, "Commit rejected, starting the move over");
            session.reset_selection();
            return stage_prompt(session).prefixed(describe::error_text(&e));
        }

        let recorded = format!("Recorded: {}.", describe::move_text(&mv));
        if let Some(outcome) = session.outcome() {
            self.record_finished(session, outcome).await;
            return stage_prompt(session).prefixed(recorded);
        }
        self.engine_turn(session).await.prefixed(recorded)
    }

    /// Asks the engine for the side to move and, when configured and no
    /// move is being reported, plays its answer.
    #[instrument(skip(self, session), fields(fen = %session.position()))]
    async fn engine_turn(&self, session: &mut GameSession) -> Reply {
        if session.is_terminal() {
            return stage_prompt(session);
        }

        let position = session.position().clone();
        let analysis = match self.oracle.best_move(&position, self.settings.budget).await {
            Ok(analysis) => analysis,
            Err(OracleError::Timeout { after }) => {
                let error = GameError::EngineTimeout {
                    after_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
                };
                warn!(error = %error, "Engine timed out, position unchanged");
                return stage_prompt(session)
                    .prefixed(describe::error_text(&error))
                    .with_option_once(describe::analyze_option());
            }
            Err(OracleError::Engine(e)) => {
                error!(error = %e, "Engine failed");
                return stage_prompt(session).prefixed(describe::TRY_AGAIN);
            }
        };

        let Some(suggestion) = position.legal_move_from_uci(&analysis.best_move) else {
            error!(best_move = %analysis.best_move, "Engine suggested an illegal move");
            return stage_prompt(session).prefixed(describe::TRY_AGAIN);
        };
        let mut text = describe::analysis_text(&suggestion, &analysis);

        if self.settings.apply_suggestion && session.selection().is_empty() {
            if let Err(e) = session.commit(&suggestion) {
                error!(error = %e, "Could not apply engine move");
                return stage_prompt(session).prefixed(describe::TRY_AGAIN);
            }
            text.push_str(" Play it on your board.");
            if let Some(outcome) = session.outcome() {
                self.record_finished(session, outcome).await;
            }
        }

        stage_prompt(session).prefixed(text)
    }

    async fn ensure_session(&self, id: &ConversationId) -> Result<(), DbError> {
        if self.registry.contains(id) {
            return Ok(());
        }

        let restored = match self.store.clone() {
            Some(store) => {
                let lookup = id.clone();
                run_blocking(move || store.load_snapshot(&lookup))
                    .await?
                    .and_then(|snapshot| {
                        GameSession::restore(snapshot)
                            .inspect_err(|e| warn!(error = %e, "Discarding unreadable snapshot"))
                            .ok()
                    })
            }
            None => None,
        };

        if restored.is_some() {
            info!(conversation_id = %id, "Resuming stored session");
        }
        self.registry.get_or_insert_with(id, || {
            restored.unwrap_or_else(|| GameSession::create(id.clone()))
        });
        Ok(())
    }

    async fn persist(&self, session: &GameSession) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let snapshot = session.snapshot();
        if let Err(e) = run_blocking(move || store.save_snapshot(&snapshot)).await {
            error!(error = %e, "Could not save session");
        }
    }

    async fn record_finished(&self, session: &GameSession, outcome: GameOutcome) {
        info!(%outcome, moves = session.history().len(), "Game finished");
        let Some(store) = self.store.clone() else {
            return;
        };
        let record = NewGameRecord::finished(&session.snapshot(), outcome);
        if let Err(e) = run_blocking(move || store.record_game(record)).await {
            error!(error = %e, "Could not record finished game");
        }
    }
}

/// Runs a store call on the blocking pool.
async fn run_blocking<T, F>(task: F) -> Result<T, DbError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, DbError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| DbError::new(format!("Store task failed: {}", e)))?
}
