//! Engine discovery and UCI handshake
//!
//! Spawns each launch candidate in turn and keeps the first one that
//! identifies itself as a UCI engine within the handshake timeout.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::channel::UciChannel;
use crate::config::{EngineConfig, LaunchCandidate};
use crate::error::{ChannelError, Error, Result};

/// A running engine: the child process plus its channel
pub struct EngineProcess {
    /// None for engines attached through a pre-connected channel
    child: Option<Child>,
    channel: UciChannel,
    identity: String,
}

impl EngineProcess {
    /// Spawns the candidate with piped stdin/stdout
    pub fn spawn(candidate: &LaunchCandidate) -> std::io::Result<Self> {
        let mut child = Command::new(&candidate.program)
            .args(&candidate.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "Failed to open stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "Failed to open stdout"))?;

        Ok(Self {
            child: Some(child),
            channel: UciChannel::new(stdout, stdin),
            identity: candidate.program.display().to_string(),
        })
    }

    /// Attaches an engine that is already connected through `channel`
    pub fn from_channel(channel: UciChannel, identity: impl Into<String>) -> Self {
        Self {
            child: None,
            channel,
            identity: identity.into(),
        }
    }

    pub fn channel(&mut self) -> &mut UciChannel {
        &mut self.channel
    }

    /// Engine name from `id name`, or the launch path before the handshake
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// OS process id, if this engine is a child process that is still running
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Signals the process to die without waiting for it
    pub fn kill(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if let Err(e) = child.start_kill() {
                debug!("engine kill failed: {}", e);
            }
        }
    }

    /// Kills the process and reaps it
    pub async fn discard(mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                debug!("engine kill failed: {}", e);
            }
        }
    }

    /// Asks the engine to quit, killing it if it is still running after `grace`
    pub async fn terminate(mut self, grace: Duration) {
        if let Err(e) = self.channel.send("quit").await {
            debug!("quit not delivered: {}", e);
        }

        let Some(mut child) = self.child.take() else {
            return;
        };

        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => debug!("engine exited: {}", status),
            Ok(Err(e)) => warn!("waiting for engine failed: {}", e),
            Err(_) => {
                warn!("engine ignored quit for {:?}, killing it", grace);
                if let Err(e) = child.kill().await {
                    warn!("engine kill failed: {}", e);
                }
            }
        }
    }
}

/// Bounded UCI handshake over the configured candidates
pub struct EngineHandshake<'a> {
    config: &'a EngineConfig,
}

impl<'a> EngineHandshake<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Returns the first candidate that completes the handshake
    ///
    /// Every other process spawned along the way is killed and reaped.
    pub async fn connect(&self) -> Result<EngineProcess> {
        for candidate in &self.config.candidates {
            let path = candidate.program.display();

            let mut engine = match EngineProcess::spawn(candidate) {
                Ok(engine) => engine,
                Err(e) => {
                    debug!("engine not started from {}: {}", path, e);
                    continue;
                }
            };

            match self.identify(&mut engine).await {
                Ok(true) => {
                    info!("engine ready: {} ({})", engine.identity(), path);
                    return Ok(engine);
                }
                Ok(false) => debug!("{} is not a UCI engine", path),
                Err(e) => debug!("handshake with {} failed: {}", path, e),
            }
            engine.discard().await;
        }

        warn!(
            "no chess engine found among {} candidates; install stockfish or set STOCKFISH_PATH",
            self.config.candidates.len()
        );
        Err(Error::Handshake {
            attempted: self.config.candidates.len(),
        })
    }

    /// Runs the handshake on an already started engine
    ///
    /// Returns `Ok(false)` when the first line does not identify a UCI
    /// engine. On success the engine has answered `uciok` and `readyok`.
    pub async fn identify(&self, engine: &mut EngineProcess) -> std::result::Result<bool, ChannelError> {
        let deadline = Instant::now() + self.config.handshake_timeout;

        engine.channel.send("uci").await?;
        let first = engine.channel.receive_line(self.remaining(deadline)?).await?;
        if !is_identification(&first, &self.config.identification_tokens) {
            return Ok(false);
        }

        let mut name = first.strip_prefix("id name ").map(str::to_string);
        loop {
            let line = engine.channel.receive_line(self.remaining(deadline)?).await?;
            if line == "uciok" {
                break;
            }
            if let Some(id) = line.strip_prefix("id name ") {
                name = Some(id.to_string());
            }
        }

        engine.channel.send("isready").await?;
        while engine.channel.receive_line(self.remaining(deadline)?).await? != "readyok" {}

        if let Some(name) = name {
            engine.identity = name;
        }
        Ok(true)
    }

    fn remaining(&self, deadline: Instant) -> std::result::Result<Duration, ChannelError> {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return Err(ChannelError::Timeout(self.config.handshake_timeout));
        }
        Ok(left)
    }
}

fn is_identification(line: &str, tokens: &[String]) -> bool {
    tokens.iter().any(|token| line.contains(token.as_str()))
}
