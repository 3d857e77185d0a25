//! Boardside - unified CLI
//!
//! Runs one chat adapter in front of the move resolver and the engine.

use anyhow::{Context, Result};
use boardside::cli::{Cli, Command};
use boardside::{
    BoardsideConfig, DispatchSettings, Dispatcher, MoveOracle, SessionStore, TelegramBot,
    UciEngine, console, describe, http,
};
use boardside_chess::{Position, SessionRegistry};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Logs go to stderr so the console adapter owns stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,boardside=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = BoardsideConfig::load(&cli.config)?;

    match cli.command {
        Command::Serve { port, host } => {
            let config = config.with_listener(host, port);
            let dispatcher = build_dispatcher(&config)?;
            http::serve(dispatcher, config.server().host(), *config.server().port()).await
        }
        Command::Telegram => {
            let dispatcher = build_dispatcher(&config)?;
            TelegramBot::new(config.telegram(), dispatcher)?.run().await
        }
        Command::Console { conversation } => {
            let dispatcher = build_dispatcher(&config)?;
            console::run(dispatcher, &conversation).await
        }
        Command::Analyze { fen } => analyze(&config, &fen).await,
    }
}

#[instrument(skip_all)]
fn build_dispatcher(config: &BoardsideConfig) -> Result<Arc<Dispatcher>> {
    let oracle: Arc<dyn MoveOracle> = Arc::new(UciEngine::from_config(config.engine()));
    let store = match config.database().path() {
        Some(path) => Some(
            SessionStore::open(path)
                .with_context(|| format!("Failed to open session store at {}", path))?,
        ),
        None => {
            info!("No database configured, sessions live in memory only");
            None
        }
    };

    Ok(Arc::new(Dispatcher::new(
        SessionRegistry::new(),
        oracle,
        store,
        DispatchSettings::from_config(config),
    )))
}

/// One-off engine query from the command line.
#[instrument(skip(config))]
async fn analyze(config: &BoardsideConfig, fen: &str) -> Result<()> {
    let position = Position::from_fen(fen).context("Invalid FEN")?;
    let engine = UciEngine::from_config(config.engine());
    let settings = DispatchSettings::from_config(config);

    let analysis = engine.best_move(&position, *settings.budget()).await?;
    let suggestion = position
        .legal_move_from_uci(&analysis.best_move)
        .with_context(|| format!("Engine returned an illegal move: {}", analysis.best_move))?;

    println!("{}", describe::analysis_text(&suggestion, &analysis));
    if !analysis.pv.is_empty() {
        println!("Line: {}", analysis.pv.join(" "));
    }
    Ok(())
}
