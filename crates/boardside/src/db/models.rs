//! Rows of the session store.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use tracing::instrument;

use crate::db::{DbError, schema};
use boardside_chess::{GameOutcome, SessionSnapshot};

/// Latest snapshot of one conversation's session.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, Getters, new)]
#[diesel(table_name = schema::sessions)]
pub struct StoredSession {
    conversation_id: String,
    snapshot: String,
    updated_at: NaiveDateTime,
}

impl StoredSession {
    /// Encodes a snapshot stamped with the current time.
    #[instrument(skip_all, fields(conversation_id = %snapshot.conversation_id))]
    pub fn encode(snapshot: &SessionSnapshot) -> Result<Self, DbError> {
        Ok(Self::new(
            snapshot.conversation_id.to_string(),
            serde_json::to_string(snapshot)?,
            chrono::Utc::now().naive_utc(),
        ))
    }

    /// Decodes the stored snapshot.
    #[instrument(skip(self), fields(conversation_id = %self.conversation_id))]
    pub fn decode(&self) -> Result<SessionSnapshot, DbError> {
        Ok(serde_json::from_str(&self.snapshot)?)
    }
}

/// A finished game.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::game_records)]
pub struct GameRecord {
    id: i32,
    conversation_id: String,
    result: String,
    termination: String,
    moves_count: i32,
    final_fen: String,
    finished_at: NaiveDateTime,
}

/// Insertable record of a game that just ended.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::game_records)]
pub struct NewGameRecord {
    conversation_id: String,
    result: String,
    termination: String,
    moves_count: i32,
    final_fen: String,
}

impl NewGameRecord {
    /// Builds the record for a game that ended with `outcome`.
    #[instrument(skip(snapshot), fields(conversation_id = %snapshot.conversation_id))]
    pub fn finished(snapshot: &SessionSnapshot, outcome: GameOutcome) -> Self {
        Self::new(
            snapshot.conversation_id.to_string(),
            outcome.result().to_string(),
            outcome.termination().to_string(),
            i32::try_from(snapshot.moves.len()).unwrap_or(i32::MAX),
            snapshot.fen.clone(),
        )
    }
}
