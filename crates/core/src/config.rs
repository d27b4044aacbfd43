//! Engine configuration

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Locations tried when no explicit engine path is configured
const DEFAULT_ENGINE_PATHS: &[&str] = &[
    "stockfish",
    "/opt/homebrew/bin/stockfish",
    "/usr/local/bin/stockfish",
    "/usr/bin/stockfish",
    "/usr/games/stockfish",
];

/// An executable to try during the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCandidate {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl LaunchCandidate {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Tried in order; the first one to pass the handshake is kept
    pub candidates: Vec<LaunchCandidate>,
    /// Any of these in the first output line identifies a UCI engine
    pub identification_tokens: Vec<String>,
    pub handshake_timeout: Duration,
    /// Added to the search budget to get the hard read ceiling
    pub read_margin: Duration,
    /// How long `quit` is given before the process is killed
    pub shutdown_grace: Duration,
    /// Callers allowed to wait while a session is running
    pub queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_ENGINE_PATHS.iter().map(|path| LaunchCandidate::new(*path)).collect(),
            identification_tokens: vec!["id name".into(), "Stockfish".into()],
            handshake_timeout: Duration::from_secs(5),
            read_margin: Duration::from_secs(2),
            shutdown_grace: Duration::from_millis(500),
            queue_capacity: 8,
        }
    }
}

impl EngineConfig {
    /// Default configuration with overrides from the environment
    ///
    /// * `STOCKFISH_PATH` - tried before the default locations
    /// * `ENGINE_READ_MARGIN_MS`
    /// * `ENGINE_QUEUE_CAPACITY`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("STOCKFISH_PATH") {
            if !path.trim().is_empty() {
                config = config.prefer_candidate(LaunchCandidate::new(path.trim()));
            }
        }
        if let Some(ms) = env_number("ENGINE_READ_MARGIN_MS") {
            config.read_margin = Duration::from_millis(ms);
        }
        if let Some(capacity) = env_number("ENGINE_QUEUE_CAPACITY") {
            config.queue_capacity = usize::try_from(capacity).unwrap_or(usize::MAX);
        }

        config
    }

    /// Replaces the candidate list
    pub fn with_candidates(mut self, candidates: Vec<LaunchCandidate>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Moves `candidate` to the front of the list, dropping any duplicate
    pub fn prefer_candidate(mut self, candidate: LaunchCandidate) -> Self {
        self.candidates.retain(|c| c != &candidate);
        self.candidates.insert(0, candidate);
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn read_margin(mut self, margin: Duration) -> Self {
        self.read_margin = margin;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

fn env_number(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("ignoring {}={:?}: not a number", name, raw);
            None
        }
    }
}
