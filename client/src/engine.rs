//! Move generation.
//!
//! The session asks a [MoveGenerator] for the best reply to a FEN position and
//! gets back coordinate notation (`e2e4`, `e7e8q`). [UciEngine] drives an
//! external engine process over the UCI text protocol.
use std::{collections::BTreeMap, future::Future, path::Path, process::Stdio, time::Duration};

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines},
    process::{Child, ChildStdin, ChildStdout, Command},
};
use tracing::{debug, info, trace, warn};

use crate::{Error, Result};

/// How long an engine gets to exit after `quit` before it is killed.
const QUIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Produces moves for a position.
pub trait MoveGenerator: Send {
    /// Best move for `fen` searched to `depth` plies, in coordinate notation.
    fn best_move(&mut self, fen: &str, depth: u32) -> impl Future<Output = Result<String>> + Send;

    /// Releases whatever the generator holds.
    fn shutdown(&mut self) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}

/// A UCI engine running as a child process.
pub struct UciEngine {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    name: Option<String>,
}

impl UciEngine {
    /// Starts the engine, applies `options` and waits until it is ready.
    pub async fn spawn(path: &Path, options: &BTreeMap<String, String>) -> Result<Self> {
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Engine("engine stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Engine("engine stdout unavailable".to_string()))?;
        let mut engine = Self {
            child,
            stdin,
            lines: BufReader::new(stdout).lines(),
            name: None,
        };

        engine.send("uci").await?;
        engine.read_until("uciok").await?;
        for (name, value) in options {
            engine
                .send(&format!("setoption name {name} value {value}"))
                .await?;
        }
        engine.send("isready").await?;
        engine.read_until("readyok").await?;
        info!(path = %path.display(), name = ?engine.name, options = options.len(), "engine ready");
        Ok(engine)
    }

    async fn send(&mut self, line: &str) -> Result<()> {
        trace!(line, "to engine");
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Reads lines until one starts with `token` and returns that line.
    async fn read_until(&mut self, token: &str) -> Result<String> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                return Err(Error::Engine(format!("engine exited before {token}")));
            };
            trace!(line, "from engine");
            if let Some(rest) = line.strip_prefix("id name ") {
                self.name = Some(rest.to_string());
            }
            if line.split_whitespace().next() == Some(token) {
                return Ok(line);
            }
        }
    }
}

/// Extracts the move from a `bestmove e2e4 ponder e7e5` line.
fn parse_bestmove(line: &str) -> Result<String> {
    let mut words = line.split_whitespace();
    match (words.next(), words.next()) {
        (Some("bestmove"), Some("(none)")) | (Some("bestmove"), None) => {
            Err(Error::Engine("engine found no move".to_string()))
        }
        (Some("bestmove"), Some(mv)) => Ok(mv.to_string()),
        _ => Err(Error::Engine(format!("unexpected engine output: {line}"))),
    }
}

impl MoveGenerator for UciEngine {
    async fn best_move(&mut self, fen: &str, depth: u32) -> Result<String> {
        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!("go depth {depth}")).await?;
        let line = self.read_until("bestmove").await?;
        let mv = parse_bestmove(&line)?;
        debug!(fen, depth, mv, "engine move");
        Ok(mv)
    }

    async fn shutdown(&mut self) -> Result<()> {
        if let Err(err) = self.send("quit").await {
            warn!(?err, "failed to ask engine to quit");
        }
        match tokio::time::timeout(QUIT_TIMEOUT, self.child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "engine exited"),
            Ok(Err(err)) => {
                warn!(?err, "engine did not exit, killing");
                self.child.kill().await?;
            }
            Err(_) => {
                warn!(timeout = ?QUIT_TIMEOUT, "engine ignored quit, killing");
                self.child.kill().await?;
            }
        }
        Ok(())
    }
}
