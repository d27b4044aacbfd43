//! Engine process ownership and session serialization
//!
//! `EngineManager` is the only owner of the engine process. The UCI channel
//! has no request ids, so at most one session may use it at a time: the
//! process slot sits behind an async mutex, and a semaphore bounds how many
//! callers may queue for it.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::{MutexGuard, Semaphore, SemaphorePermit};
use tracing::{info, warn};

use super::analysis::{AnalysisRequest, AnalysisResult};
use super::channel::UciChannel;
use super::handshake::{EngineHandshake, EngineProcess};
use super::session::AnalysisSession;
use crate::config::EngineConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    /// No handshake attempted yet
    Uninitialized,
    Ready,
    /// A session holds the channel
    Busy,
    /// Handshake failed, a session faulted or the engine was shut down.
    /// Only `restart` leaves this state.
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Health {
    pub ready: bool,
    pub state: EngineState,
}

pub struct EngineManager {
    config: EngineConfig,
    state: Mutex<EngineState>,
    engine: tokio::sync::Mutex<Option<EngineProcess>>,
    /// One permit for the active session plus `queue_capacity` waiters
    queue: Semaphore,
}

impl EngineManager {
    /// Creates a manager with no engine; call [`EngineManager::start`] next
    pub fn new(config: EngineConfig) -> Self {
        Self::build(config, None, EngineState::Uninitialized)
    }

    /// Adopts an engine that has already completed its handshake
    pub fn with_engine(config: EngineConfig, engine: EngineProcess) -> Self {
        Self::build(config, Some(engine), EngineState::Ready)
    }

    fn build(config: EngineConfig, engine: Option<EngineProcess>, state: EngineState) -> Self {
        let waiters = config.queue_capacity.min(Semaphore::MAX_PERMITS - 1);
        if waiters < config.queue_capacity {
            warn!("queue capacity {} clamped to {}", config.queue_capacity, waiters);
        }
        let queue = Semaphore::new(waiters + 1);
        Self {
            config,
            state: Mutex::new(state),
            engine: tokio::sync::Mutex::new(engine),
            queue,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: EngineState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Readiness as seen by callers; never waits on a running session
    pub fn health(&self) -> Health {
        let state = self.state();
        Health {
            ready: matches!(state, EngineState::Ready | EngineState::Busy),
            state,
        }
    }

    /// Runs the handshake unless an engine is already running
    pub async fn start(&self) -> Result<()> {
        let mut slot = self.engine.lock().await;
        if slot.is_some() && self.state() == EngineState::Ready {
            return Ok(());
        }
        self.connect(&mut slot).await
    }

    /// Replaces the current engine (if any) with a freshly started one
    ///
    /// This is the only way out of `Unavailable`; faults never trigger an
    /// automatic restart.
    pub async fn restart(&self) -> Result<()> {
        let mut slot = self.engine.lock().await;
        if let Some(engine) = slot.take() {
            info!("restarting engine {}", engine.identity());
            engine.terminate(self.config.shutdown_grace).await;
        }
        self.connect(&mut slot).await
    }

    async fn connect(&self, slot: &mut Option<EngineProcess>) -> Result<()> {
        match EngineHandshake::new(&self.config).connect().await {
            Ok(engine) => {
                *slot = Some(engine);
                self.set_state(EngineState::Ready);
                Ok(())
            }
            Err(e) => {
                *slot = None;
                self.set_state(EngineState::Unavailable);
                Err(e)
            }
        }
    }

    /// Waits for exclusive use of the engine
    ///
    /// Fails with `EngineBusy` right away when the wait queue is full, and
    /// with `EngineUnavailable` when there is no ready engine once it is
    /// this caller's turn.
    pub async fn acquire(&self) -> Result<EngineLease<'_>> {
        let permit = self.queue.try_acquire().map_err(|_| Error::EngineBusy)?;
        let slot = self.engine.lock().await;

        if slot.is_none() || self.state() != EngineState::Ready {
            return Err(Error::EngineUnavailable);
        }

        self.set_state(EngineState::Busy);
        Ok(EngineLease {
            manager: self,
            slot,
            _permit: permit,
            settled: false,
        })
    }

    /// Analyzes one position
    ///
    /// A communication fault kills the engine and leaves the manager
    /// `Unavailable`; it is reported as `Error::Communication`, never as an
    /// empty result.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        request.validate()?;

        let mut lease = self.acquire().await?;
        let outcome = {
            let channel = lease.channel()?;
            AnalysisSession::new(channel, self.config.read_margin)
                .run(request)
                .await
        };

        match outcome {
            Ok(result) => {
                lease.release();
                Ok(result)
            }
            Err(e) => {
                warn!("analysis aborted, engine marked unavailable: {}", e);
                lease.fault();
                Err(Error::Communication(e))
            }
        }
    }

    /// Stops the engine: `quit`, then a forced kill after the grace period
    pub async fn shutdown(&self) {
        let mut slot = self.engine.lock().await;
        if let Some(engine) = slot.take() {
            info!("shutting down engine {}", engine.identity());
            engine.terminate(self.config.shutdown_grace).await;
        }
        self.set_state(EngineState::Unavailable);
    }
}

/// Exclusive use of the engine for one session
///
/// Finish with [`EngineLease::release`] or [`EngineLease::fault`]. A lease
/// dropped without either (e.g. a cancelled caller) may have left a search
/// running, so it is treated as a fault.
pub struct EngineLease<'a> {
    manager: &'a EngineManager,
    slot: MutexGuard<'a, Option<EngineProcess>>,
    _permit: SemaphorePermit<'a>,
    settled: bool,
}

impl EngineLease<'_> {
    pub fn channel(&mut self) -> Result<&mut UciChannel> {
        self.slot
            .as_mut()
            .map(EngineProcess::channel)
            .ok_or(Error::EngineUnavailable)
    }

    /// Hands the engine back for the next caller
    pub fn release(mut self) {
        self.settled = true;
        self.manager.set_state(EngineState::Ready);
    }

    /// Kills the engine; the manager stays unavailable until restarted
    pub fn fault(mut self) {
        self.settled = true;
        self.discard();
    }

    fn discard(&mut self) {
        if let Some(mut engine) = self.slot.take() {
            engine.kill();
        }
        self.manager.set_state(EngineState::Unavailable);
    }
}

impl Drop for EngineLease<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("engine lease dropped mid-session, discarding engine");
            self.discard();
        }
    }
}
