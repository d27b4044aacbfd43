//! Chess engine integration
//!
//! Drives a UCI-compatible engine like Stockfish as a long-lived subprocess.

pub mod analysis;
pub mod channel;
pub mod handshake;
pub mod manager;
pub mod parser;
pub mod session;

// Re-export main types for convenience
pub use analysis::{AnalysisLine, AnalysisRequest, AnalysisResult, BestMove, Evaluation};
pub use channel::UciChannel;
pub use handshake::{EngineHandshake, EngineProcess};
pub use manager::{EngineLease, EngineManager, EngineState, Health};
pub use parser::{parse_line, ParsedLine};
pub use session::{AnalysisSession, SessionPhase};

/// In-memory engines for unit tests
#[cfg(test)]
pub(crate) mod script {
    use std::sync::{Arc, Mutex};

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    use super::UciChannel;

    /// Channel to a task that answers each received command with `respond`
    pub fn scripted<F>(respond: F) -> UciChannel
    where
        F: FnMut(&str) -> Vec<String> + Send + 'static,
    {
        recorded(respond).0
    }

    /// Like [`scripted`], also returning every command the engine received
    pub fn recorded<F>(mut respond: F) -> (UciChannel, Arc<Mutex<Vec<String>>>)
    where
        F: FnMut(&str) -> Vec<String> + Send + 'static,
    {
        let (client, server) = tokio::io::duplex(4096);
        let (read, write) = tokio::io::split(client);
        let log = Arc::new(Mutex::new(Vec::new()));
        let engine_log = log.clone();

        tokio::spawn(async move {
            let (server_read, mut server_write) = tokio::io::split(server);
            let mut commands = BufReader::new(server_read).lines();
            while let Ok(Some(command)) = commands.next_line().await {
                engine_log.lock().unwrap().push(command.clone());
                for reply in respond(&command) {
                    let out = format!("{}\n", reply);
                    if server_write.write_all(out.as_bytes()).await.is_err() {
                        return;
                    }
                }
            }
        });

        (UciChannel::new(read, write), log)
    }

    /// An engine that never answers
    pub fn silent() -> UciChannel {
        scripted(|_| Vec::new())
    }

    /// Answers the handshake, then `info` followed by `best` for every `go`
    pub fn stockfish_like(
        info: &[&str],
        best: &str,
    ) -> impl FnMut(&str) -> Vec<String> + Send + 'static {
        let mut search: Vec<String> = info.iter().map(|s| s.to_string()).collect();
        search.push(best.to_string());

        move |command: &str| match command.split_whitespace().next() {
            Some("uci") => vec!["id name FakeFish 1.0".into(), "id author test".into(), "uciok".into()],
            Some("isready") => vec!["readyok".into()],
            Some("go") => search.clone(),
            _ => Vec::new(),
        }
    }
}
