//! Service configuration loaded from TOML with environment overrides.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Environment variable overriding `engine.path`.
pub const ENGINE_PATH_VAR: &str = "BOARDSIDE_ENGINE_PATH";
/// Environment variable overriding `telegram.token`.
pub const TELEGRAM_TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";
/// Environment variable overriding `database.path`.
pub const DATABASE_VAR: &str = "BOARDSIDE_DATABASE";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardsideConfig {
    /// UCI engine process and search limits.
    engine: EngineConfig,
    /// Game behaviour.
    game: GameConfig,
    /// HTTP adapter.
    server: ServerConfig,
    /// Telegram adapter.
    telegram: TelegramConfig,
    /// Persistence.
    database: DatabaseConfig,
}

/// UCI engine settings.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine executable (looked up on `PATH` if not absolute).
    #[serde(default = "default_engine_path")]
    path: String,

    /// Extra command-line arguments for the engine.
    #[serde(default)]
    args: Vec<String>,

    /// Thinking time per query, in milliseconds.
    #[serde(default = "default_movetime_ms")]
    movetime_ms: u64,

    /// Fixed search depth. Takes precedence over `movetime_ms` when set.
    #[serde(default)]
    depth: Option<u32>,

    /// Upper bound on one query, including engine start-up.
    #[serde(default = "default_timeout_ms")]
    timeout_ms: u64,
}

/// Game behaviour settings.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
pub struct GameConfig {
    /// Play the engine's suggestion on the board right away, so the user
    /// only ever reports the opponent's moves.
    #[serde(default = "default_apply_suggestion")]
    apply_suggestion: bool,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    host: String,

    /// Port to bind to.
    #[serde(default = "default_port")]
    port: u16,
}

/// Telegram Bot API settings.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token. Usually supplied through `TELEGRAM_BOT_TOKEN`.
    #[serde(default)]
    token: Option<String>,

    /// Long-poll timeout passed to `getUpdates`, in seconds.
    #[serde(default = "default_poll_timeout_secs")]
    poll_timeout_secs: u64,

    /// Bot API base URL.
    #[serde(default = "default_api_url")]
    api_url: String,
}

/// Persistence settings.
#[derive(Debug, Clone, Default, PartialEq, Getters, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file. Sessions live in memory only when unset.
    #[serde(default)]
    path: Option<String>,
}

fn default_engine_path() -> String {
    "stockfish".to_string()
}

fn default_movetime_ms() -> u64 {
    100
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_apply_suggestion() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: default_engine_path(),
            args: Vec::new(),
            movetime_ms: default_movetime_ms(),
            depth: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl EngineConfig {
    /// Query timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Thinking time as a [`Duration`].
    pub fn movetime(&self) -> Duration {
        Duration::from_millis(self.movetime_ms)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            apply_suggestion: default_apply_suggestion(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            poll_timeout_secs: default_poll_timeout_secs(),
            api_url: default_api_url(),
        }
    }
}

impl BoardsideConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(engine = %config.engine.path, "Config loaded successfully");
        Ok(config)
    }

    /// Loads `path` if it exists, defaults otherwise, then applies
    /// environment overrides.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = if path.as_ref().exists() {
            Self::from_file(path)?
        } else {
            info!("No config file, using defaults");
            Self::default()
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Applies overrides looked up by environment variable name.
    #[instrument(skip_all)]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(ENGINE_PATH_VAR) {
            debug!(%path, "Engine path overridden from environment");
            self.engine.path = path;
        }
        if let Some(token) = lookup(TELEGRAM_TOKEN_VAR) {
            debug!("Telegram token read from environment");
            self.telegram.token = Some(token);
        }
        if let Some(path) = lookup(DATABASE_VAR) {
            debug!(%path, "Database path overridden from environment");
            self.database.path = Some(path);
        }
        self
    }

    /// Replaces the HTTP listener address where given.
    pub fn with_listener(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
        self
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
