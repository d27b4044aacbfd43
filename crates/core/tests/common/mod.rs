//! In-memory UCI engines for integration tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chess_sight_core::config::EngineConfig;
use chess_sight_core::engine::{EngineManager, EngineProcess, UciChannel};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// What a scripted engine does after receiving `go`
#[derive(Clone)]
pub enum Search {
    /// Reply with these lines, pausing between them
    Reply { lines: Vec<String>, pause: Duration },
    /// Echo the current FEN back as the only move of the variation
    EchoPosition { pause: Duration },
    /// Never answer
    Hang,
    /// Close the output stream
    Close,
}

impl Search {
    pub fn reply(lines: &[&str]) -> Self {
        Search::Reply {
            lines: lines.iter().map(|s| s.to_string()).collect(),
            pause: Duration::ZERO,
        }
    }
}

/// Commands received by a scripted engine, in order
pub type CommandLog = Arc<Mutex<Vec<String>>>;

/// Spawns an engine task answering the UCI handshake and `go` per `search`
pub fn scripted_engine(search: Search) -> (UciChannel, CommandLog) {
    let (client, server) = tokio::io::duplex(4096);
    let (read, write) = tokio::io::split(client);
    let log: CommandLog = Arc::new(Mutex::new(Vec::new()));
    let engine_log = log.clone();

    tokio::spawn(async move {
        let (server_read, mut server_write) = tokio::io::split(server);
        let mut commands = BufReader::new(server_read).lines();
        let mut position = String::new();

        while let Ok(Some(command)) = commands.next_line().await {
            engine_log.lock().unwrap().push(command.clone());

            let (replies, pause) = if command == "uci" {
                (vec!["id name FakeFish 1.0".to_string(), "uciok".to_string()], Duration::ZERO)
            } else if command == "isready" {
                (vec!["readyok".to_string()], Duration::ZERO)
            } else if let Some(fen) = command.strip_prefix("position fen ") {
                position = fen.to_string();
                continue;
            } else if command.starts_with("go") {
                match &search {
                    Search::Reply { lines, pause } => (lines.clone(), *pause),
                    Search::EchoPosition { pause } => (
                        vec![
                            format!("info depth 1 multipv 1 score cp 0 pv {}", position),
                            format!("info depth 2 multipv 1 score cp 0 pv {}", position),
                            format!("bestmove {}", position),
                        ],
                        *pause,
                    ),
                    Search::Hang => continue,
                    Search::Close => return,
                }
            } else {
                continue;
            };

            for reply in replies {
                if !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                }
                let out = format!("{}\n", reply);
                if server_write.write_all(out.as_bytes()).await.is_err() {
                    return;
                }
            }
        }
    });

    (UciChannel::new(read, write), log)
}

/// A ready manager backed by a scripted engine
pub fn scripted_manager(search: Search, config: EngineConfig) -> (EngineManager, CommandLog) {
    let (channel, log) = scripted_engine(search);
    let manager = EngineManager::with_engine(config, EngineProcess::from_channel(channel, "FakeFish"));
    (manager, log)
}
