//! Boardside service: chat adapters around the move resolver.
//!
//! # Architecture
//!
//! - **Dispatcher**: routes [`ChatEvent`]s to per-conversation sessions
//! - **Engine**: UCI engine behind the [`MoveOracle`] trait
//! - **Store**: SQLite snapshots so games survive restarts
//! - **Adapters**: HTTP webhook, Telegram long polling, terminal
//!
//! # Example
//!
//! ```no_run
//! use boardside::{BoardsideConfig, DispatchSettings, Dispatcher, UciEngine};
//! use boardside_chess::SessionRegistry;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = BoardsideConfig::load("boardside.toml")?;
//! let engine = UciEngine::from_config(config.engine());
//! let dispatcher = Arc::new(Dispatcher::new(
//!     SessionRegistry::new(),
//!     Arc::new(engine),
//!     None,
//!     DispatchSettings::from_config(&config),
//! ));
//! boardside::http::serve(dispatcher, "127.0.0.1", 3000).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chat;
pub mod cli;
pub mod config;
pub mod console;
pub mod db;
pub mod describe;
pub mod dispatcher;
pub mod engine;
pub mod http;
pub mod telegram;

pub use chat::{ChatCommand, ChatEvent, EventKind, Reply, ReplyOption};
pub use config::{BoardsideConfig, ConfigError};
pub use db::{DbError, GameRecord, NewGameRecord, SessionStore, StoredSession};
pub use dispatcher::{DispatchSettings, Dispatcher};
pub use engine::{Analysis, EngineError, MoveOracle, OracleError, Score, SearchBudget, UciEngine};
pub use http::router;
pub use telegram::TelegramBot;
