//! Session store backed by a SQLite file.

use boardside_chess::{ConversationId, SessionSnapshot};
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument};

use crate::db::{DbError, GameRecord, NewGameRecord, StoredSession, schema};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Persists session snapshots and finished games.
///
/// Each call opens its own connection, so the store is cheap to clone and
/// safe to use from blocking tasks.
#[derive(Debug, Clone)]
pub struct SessionStore {
    db_path: String,
}

impl SessionStore {
    /// Opens the database at `db_path`, creating it and applying pending
    /// migrations as needed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the file cannot be opened or migrated.
    #[instrument(skip(db_path), fields(db_path = %db_path.as_ref()))]
    pub fn open(db_path: impl AsRef<str>) -> Result<Self, DbError> {
        let store = Self {
            db_path: db_path.as_ref().to_string(),
        };
        let mut conn = store.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(format!("Migrations failed: {}", e)))?;
        info!(path = %store.db_path, migrations = applied.len(), "Session store ready");
        Ok(store)
    }

    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        SqliteConnection::establish(&self.db_path)
            .map_err(|e| DbError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))
    }

    /// Saves (or replaces) the snapshot for its conversation.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if encoding or the write fails.
    #[instrument(skip(self, snapshot), fields(conversation_id = %snapshot.conversation_id))]
    pub fn save_snapshot(&self, snapshot: &SessionSnapshot) -> Result<(), DbError> {
        let row = StoredSession::encode(snapshot)?;
        let mut conn = self.connection()?;

        diesel::replace_into(schema::sessions::table)
            .values(&row)
            .execute(&mut conn)?;

        debug!(moves = snapshot.moves.len(), "Snapshot saved");
        Ok(())
    }

    /// Loads the snapshot for `id`. Returns `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or the stored snapshot is
    /// unreadable.
    #[instrument(skip(self), fields(conversation_id = %id))]
    pub fn load_snapshot(&self, id: &ConversationId) -> Result<Option<SessionSnapshot>, DbError> {
        let mut conn = self.connection()?;

        let row = schema::sessions::table
            .filter(schema::sessions::conversation_id.eq(id.as_str()))
            .select(StoredSession::as_select())
            .first(&mut conn)
            .optional()?;

        match row {
            Some(row) => {
                debug!(updated_at = %row.updated_at(), "Snapshot found");
                row.decode().map(Some)
            }
            None => {
                debug!("No stored snapshot");
                Ok(None)
            }
        }
    }

    /// Deletes the snapshot for `id`. Returns true if one existed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self), fields(conversation_id = %id))]
    pub fn delete_snapshot(&self, id: &ConversationId) -> Result<bool, DbError> {
        let mut conn = self.connection()?;

        let deleted = diesel::delete(
            schema::sessions::table.filter(schema::sessions::conversation_id.eq(id.as_str())),
        )
        .execute(&mut conn)?;

        debug!(deleted, "Snapshot deleted");
        Ok(deleted > 0)
    }

    /// Appends a finished game.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, record), fields(conversation_id = %record.conversation_id(), result = %record.result()))]
    pub fn record_game(&self, record: NewGameRecord) -> Result<GameRecord, DbError> {
        let mut conn = self.connection()?;

        let stored = diesel::insert_into(schema::game_records::table)
            .values(&record)
            .returning(GameRecord::as_returning())
            .get_result(&mut conn)?;

        info!(
            record_id = stored.id(),
            termination = %stored.termination(),
            moves = stored.moves_count(),
            "Game recorded"
        );
        Ok(stored)
    }

    /// Finished games of one conversation, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self), fields(conversation_id = %id))]
    pub fn games_for(&self, id: &ConversationId) -> Result<Vec<GameRecord>, DbError> {
        let mut conn = self.connection()?;

        let games = schema::game_records::table
            .filter(schema::game_records::conversation_id.eq(id.as_str()))
            .order((
                schema::game_records::finished_at.desc(),
                schema::game_records::id.desc(),
            ))
            .select(GameRecord::as_select())
            .load(&mut conn)?;

        debug!(count = games.len(), "Finished games loaded");
        Ok(games)
    }

    /// Every conversation with a stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn conversation_ids(&self) -> Result<Vec<ConversationId>, DbError> {
        let mut conn = self.connection()?;

        let ids = schema::sessions::table
            .select(schema::sessions::conversation_id)
            .order(schema::sessions::conversation_id.asc())
            .load::<String>(&mut conn)?;

        debug!(count = ids.len(), "Stored conversations listed");
        Ok(ids.into_iter().map(ConversationId::new).collect())
    }
}
