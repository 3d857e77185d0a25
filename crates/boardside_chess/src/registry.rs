//! Conversation id → game session map.

use crate::error::GameError;
use crate::session::{ConversationId, GameSession};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex as SessionLock, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

/// Shared handle to one session.
pub type SessionHandle = Arc<SessionLock<GameSession>>;

/// Exclusive access to one session for the duration of one event.
pub type SessionGuard = OwnedMutexGuard<GameSession>;

/// Manages all game sessions.
///
/// The map lock is only held for lookup, insert and removal. Each session has
/// its own lock, so a slow engine query in one conversation never blocks
/// another.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<ConversationId, SessionHandle>>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating session registry");
        Self::default()
    }

    /// Returns the session for `id`, creating it at the starting position if
    /// this conversation has not been seen.
    #[instrument(skip(self), fields(conversation_id = %id))]
    pub fn get_or_create(&self, id: &ConversationId) -> SessionHandle {
        self.get_or_insert_with(id, || GameSession::create(id.clone()))
    }

    /// Returns the session for `id`, inserting the result of `init` if there
    /// is none. `init` runs under the map lock and must be cheap.
    #[instrument(skip(self, init), fields(conversation_id = %id))]
    pub fn get_or_insert_with(
        &self,
        id: &ConversationId,
        init: impl FnOnce() -> GameSession,
    ) -> SessionHandle {
        let mut sessions = self.map();
        sessions
            .entry(id.clone())
            .or_insert_with(|| {
                debug!("Registering new session");
                Arc::new(SessionLock::new(init()))
            })
            .clone()
    }

    /// Locks the session for `id` without waiting.
    ///
    /// Fails with [`GameError::SessionBusy`] while another event for the same
    /// conversation holds it.
    #[instrument(skip(self), fields(conversation_id = %id))]
    pub fn acquire(&self, id: &ConversationId) -> Result<SessionGuard, GameError> {
        self.get_or_create(id).try_lock_owned().map_err(|_| {
            warn!("Session busy, rejecting event");
            GameError::SessionBusy {
                conversation: id.clone(),
            }
        })
    }

    /// Drops the session for `id`. Removing an unknown id is a no-op.
    #[instrument(skip(self), fields(conversation_id = %id))]
    pub fn remove(&self, id: &ConversationId) -> bool {
        let removed = self.map().remove(id).is_some();
        if removed {
            info!("Session removed");
        } else {
            debug!("No session to remove");
        }
        removed
    }

    /// True if a session exists for `id`.
    pub fn contains(&self, id: &ConversationId) -> bool {
        self.map().contains_key(id)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.map().len()
    }

    /// True when no session is live.
    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    /// Lists all live conversation ids, sorted.
    #[instrument(skip(self))]
    pub fn conversation_ids(&self) -> Vec<ConversationId> {
        let mut ids: Vec<_> = self.map().keys().cloned().collect();
        ids.sort();
        debug!(count = ids.len(), "Listed sessions");
        ids
    }

    fn map(&self) -> MutexGuard<'_, HashMap<ConversationId, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
