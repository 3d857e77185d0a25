//! SQLite persistence for session snapshots and finished games.

mod error;
mod models;
mod repository;
mod schema; // Diesel generated schema - internal use only

pub use error::DbError;
pub use models::{GameRecord, NewGameRecord, StoredSession};
pub use repository::SessionStore;
