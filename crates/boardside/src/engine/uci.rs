//! UCI engine subprocess driven over stdin/stdout.

use super::{Analysis, EngineError, MoveOracle, OracleError, Score, SearchBudget};
use crate::config::EngineConfig;
use boardside_chess::Position;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, trace, warn};

/// A UCI engine (Stockfish or compatible) started on first use.
///
/// Queries are serialized over one process. A query that fails or runs
/// past the timeout discards the process; the next query starts a fresh one.
#[derive(Debug)]
pub struct UciEngine {
    path: String,
    args: Vec<String>,
    timeout: Duration,
    process: Mutex<Option<EngineProcess>>,
}

#[derive(Debug)]
struct EngineProcess {
    // Held so the engine is killed when the process handle is dropped.
    _child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
}

impl UciEngine {
    /// Creates an engine handle. Nothing is spawned until the first query.
    #[instrument(skip_all)]
    pub fn new(path: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            args,
            timeout,
            process: Mutex::new(None),
        }
    }

    /// Creates an engine handle from the `[engine]` config section.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.path().clone(), config.args().clone(), config.timeout())
    }

    #[instrument(skip(self), fields(path = %self.path))]
    async fn spawn(&self) -> Result<EngineProcess, EngineError> {
        info!(args = ?self.args, "Starting engine process");

        let mut child = Command::new(&self.path)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::new(format!("Failed to start '{}': {}", self.path, e)))?;

        let stdin = child.stdin.take().ok_or_else(|| {
            error!("Failed to capture engine stdin");
            EngineError::new("Failed to capture engine stdin")
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            error!("Failed to capture engine stdout");
            EngineError::new("Failed to capture engine stdout")
        })?;

        let mut process = EngineProcess {
            _child: child,
            stdin,
            lines: BufReader::new(stdout).lines(),
        };
        process.send("uci").await?;
        process.wait_for("uciok").await?;
        process.send("isready").await?;
        process.wait_for("readyok").await?;

        info!("Engine ready");
        Ok(process)
    }

    async fn query(
        &self,
        slot: &mut Option<EngineProcess>,
        fen: &str,
        budget: SearchBudget,
    ) -> Result<Analysis, EngineError> {
        if slot.is_none() {
            *slot = Some(self.spawn().await?);
        }
        let process = slot
            .as_mut()
            .ok_or_else(|| EngineError::new("Engine process missing after spawn"))?;
        process.search(fen, budget).await
    }
}

#[async_trait::async_trait]
impl MoveOracle for UciEngine {
    #[instrument(skip(self, position), fields(fen = %position, go = %budget.go_command()))]
    async fn best_move(
        &self,
        position: &Position,
        budget: SearchBudget,
    ) -> Result<Analysis, OracleError> {
        let fen = position.to_fen();
        let mut slot = self.process.lock().await;

        match tokio::time::timeout(self.timeout, self.query(&mut *slot, &fen, budget)).await {
            Ok(Ok(analysis)) => {
                info!(best_move = %analysis.best_move, score = ?analysis.score, "Engine answered");
                Ok(analysis)
            }
            Ok(Err(e)) => {
                error!(error = %e, "Engine query failed, discarding process");
                *slot = None;
                Err(e.into())
            }
            Err(_) => {
                warn!(
                    timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                    "Engine timed out, discarding process"
                );
                *slot = None;
                Err(OracleError::timeout(self.timeout))
            }
        }
    }
}

impl EngineProcess {
    async fn send(&mut self, command: &str) -> Result<(), EngineError> {
        trace!(%command, "-> engine");
        self.stdin.write_all(command.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn next_line(&mut self) -> Result<String, EngineError> {
        let line = self
            .lines
            .next_line()
            .await?
            .ok_or_else(|| EngineError::new("Engine closed its output"))?;
        trace!(%line, "<- engine");
        Ok(line)
    }

    async fn wait_for(&mut self, token: &str) -> Result<(), EngineError> {
        loop {
            if self.next_line().await?.trim() == token {
                return Ok(());
            }
        }
    }

    async fn search(&mut self, fen: &str, budget: SearchBudget) -> Result<Analysis, EngineError> {
        self.send("ucinewgame").await?;
        self.send("isready").await?;
        self.wait_for("readyok").await?;
        self.send(&format!("position fen {}", fen)).await?;
        self.send(&budget.go_command()).await?;

        let mut latest = InfoLine::default();
        loop {
            let line = self.next_line().await?;
            if let Some(info) = parse_info(&line) {
                latest.merge(info);
                continue;
            }
            match parse_bestmove(&line) {
                Some(Some(best_move)) => {
                    debug!(%best_move, depth = ?latest.depth, "Search finished");
                    return Ok(Analysis {
                        best_move,
                        score: latest.score,
                        pv: latest.pv,
                        depth: latest.depth,
                    });
                }
                Some(None) => return Err(EngineError::new("Engine reports no legal move")),
                None => {}
            }
        }
    }
}

/// Fields of interest from one `info` line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct InfoLine {
    depth: Option<u32>,
    score: Option<Score>,
    pv: Vec<String>,
}

impl InfoLine {
    fn merge(&mut self, newer: InfoLine) {
        if newer.depth.is_some() {
            self.depth = newer.depth;
        }
        if newer.score.is_some() {
            self.score = newer.score;
        }
        if !newer.pv.is_empty() {
            self.pv = newer.pv;
        }
    }
}

/// Parses an `info` line. `info string` lines carry no search data.
fn parse_info(line: &str) -> Option<InfoLine> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some("info") {
        return None;
    }

    let mut info = InfoLine::default();
    while let Some(token) = tokens.next() {
        match token {
            "string" => return None,
            "depth" => info.depth = tokens.next().and_then(|t| t.parse().ok()),
            "score" => {
                let kind = tokens.next();
                let value = tokens.next().and_then(|t| t.parse().ok());
                info.score = match (kind, value) {
                    (Some("cp"), Some(cp)) => Some(Score::Centipawns(cp)),
                    (Some("mate"), Some(moves)) => Some(Score::Mate(moves)),
                    _ => None,
                };
            }
            "pv" => {
                info.pv = tokens.by_ref().map(str::to_string).collect();
            }
            _ => {}
        }
    }
    Some(info)
}

/// Parses a `bestmove` line: `Some(None)` for `bestmove (none)`.
fn parse_bestmove(line: &str) -> Option<Option<String>> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some("bestmove") {
        return None;
    }
    match tokens.next() {
        Some("(none)") | Some("0000") | None => Some(None),
        Some(mv) => Some(Some(mv.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_info_with_centipawn_score() {
        let line = "info depth 12 seldepth 17 multipv 1 score cp 34 nodes 48211 nps 964220 \
                    time 50 pv e2e4 e7e5 g1f3";
        let info = parse_info(line).expect("info line");
        assert_eq!(info.depth, Some(12));
        assert_eq!(info.score, Some(Score::Centipawns(34)));
        assert_eq!(info.pv, ["e2e4", "e7e5", "g1f3"]);
    }

    #[test]
    fn test_parse_info_with_mate_and_bound() {
        let info = parse_info("info depth 9 score mate -2 lowerbound nodes 100").expect("info");
        assert_eq!(info.score, Some(Score::Mate(-2)));
        assert!(info.pv.is_empty());
    }

    #[test]
    fn test_parse_info_ignores_strings_and_other_lines() {
        assert_eq!(parse_info("info string NNUE evaluation enabled"), None);
        assert_eq!(parse_info("readyok"), None);
    }

    #[test]
    fn test_merge_keeps_last_known_fields() {
        let mut latest = parse_info("info depth 10 score cp 20 pv d2d4").expect("info");
        latest.merge(parse_info("info depth 11 currmove e2e4 currmovenumber 1").expect("info"));
        assert_eq!(latest.depth, Some(11));
        assert_eq!(latest.score, Some(Score::Centipawns(20)));
        assert_eq!(latest.pv, ["d2d4"]);
    }

    #[test]
    fn test_parse_bestmove() {
        assert_eq!(
            parse_bestmove("bestmove e7e8q ponder a2a1"),
            Some(Some("e7e8q".to_string()))
        );
        assert_eq!(parse_bestmove("bestmove (none)"), Some(None));
        assert_eq!(parse_bestmove("info depth 1"), None);
    }

    #[test]
    fn test_go_command_prefers_depth() {
        let budget = SearchBudget::new(Duration::from_millis(250), None);
        assert_eq!(budget.go_command(), "go movetime 250");
        let budget = SearchBudget::new(Duration::from_millis(250), Some(8));
        assert_eq!(budget.go_command(), "go depth 8");
    }

    /// A shell script speaking just enough UCI. `on_go` runs after each `go`.
    fn scripted_engine(on_go: &str, timeout: Duration) -> UciEngine {
        let script = format!(
            "while read -r cmd; do case \"$cmd\" in \
             uci) echo 'id name scripted'; echo uciok ;; \
             isready) echo readyok ;; \
             go*) echo 'info depth 3 score cp 12 pv e2e4 e7e5'; {} ;; \
             esac; done",
            on_go
        );
        UciEngine::new("sh", vec!["-c".to_string(), script], timeout)
    }

    #[tokio::test]
    async fn test_scripted_engine_answers_repeatedly() {
        let engine = scripted_engine("echo 'bestmove e2e4 ponder e7e5'", Duration::from_secs(5));

        for _ in 0..2 {
            let analysis = engine
                .best_move(&Position::start(), SearchBudget::default())
                .await
                .expect("engine answers");
            assert_eq!(analysis.best_move, "e2e4");
            assert_eq!(analysis.score, Some(Score::Centipawns(12)));
            assert_eq!(analysis.pv, ["e2e4", "e7e5"]);
            assert_eq!(analysis.depth, Some(3));
        }
        assert!(engine.process.lock().await.is_some());
    }

    #[tokio::test]
    async fn test_no_legal_move_is_engine_error() {
        let engine = scripted_engine("echo 'bestmove (none)'", Duration::from_secs(5));
        let result = engine
            .best_move(&Position::start(), SearchBudget::default())
            .await;
        assert!(matches!(result, Err(OracleError::Engine(_))));
        assert!(engine.process.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_silent_engine_times_out_and_is_discarded() {
        let engine = UciEngine::new(
            "sh",
            vec!["-c".to_string(), "sleep 10".to_string()],
            Duration::from_millis(300),
        );
        let started = std::time::Instant::now();
        let result = engine
            .best_move(&Position::start(), SearchBudget::default())
            .await;

        assert!(matches!(
            result,
            Err(OracleError::Timeout { after }) if after == Duration::from_millis(300)
        ));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(engine.process.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_crashed_engine_is_restarted() {
        let engine = scripted_engine("echo 'bestmove d2d4'; exit 0", Duration::from_secs(5));

        let first = engine
            .best_move(&Position::start(), SearchBudget::default())
            .await
            .expect("first query answers");
        assert_eq!(first.best_move, "d2d4");

        // The script exited after answering, so the next query fails.
        let second = engine
            .best_move(&Position::start(), SearchBudget::default())
            .await;
        assert!(second.is_err());
        assert!(engine.process.lock().await.is_none());

        let third = engine
            .best_move(&Position::start(), SearchBudget::default())
            .await
            .expect("fresh process answers");
        assert_eq!(third.best_move, "d2d4");
    }

    #[tokio::test]
    async fn test_missing_binary_is_engine_error() {
        let engine = UciEngine::new(
            "/nonexistent/boardside-test-engine",
            Vec::new(),
            Duration::from_secs(2),
        );
        let result = engine
            .best_move(&Position::start(), SearchBudget::default())
            .await;
        assert!(matches!(result, Err(OracleError::Engine(_))));
    }
}
