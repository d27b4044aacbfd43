//! One analysis exchange with the engine
//!
//! Configures the search, streams engine output until `bestmove`, and
//! assembles the aggregated result.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use super::analysis::{AnalysisRequest, AnalysisResult};
use super::channel::UciChannel;
use super::parser::{parse_line, ParsedLine};
use crate::error::ChannelError;

/// Where a session is in its exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Configuring,
    Streaming,
    Done,
}

/// Borrows the channel for exactly one request
pub struct AnalysisSession<'a> {
    channel: &'a mut UciChannel,
    read_margin: Duration,
    phase: SessionPhase,
}

impl<'a> AnalysisSession<'a> {
    pub fn new(channel: &'a mut UciChannel, read_margin: Duration) -> Self {
        Self {
            channel,
            read_margin,
            phase: SessionPhase::Configuring,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Runs the request to completion
    ///
    /// Every read shares one deadline of search budget plus read margin.
    /// Any channel error aborts the session; the stream position is then
    /// unknown and the channel must not be used again.
    pub async fn run(&mut self, request: &AnalysisRequest) -> Result<AnalysisResult, ChannelError> {
        self.phase = SessionPhase::Configuring;
        self.channel
            .send(&format!("setoption name MultiPV value {}", request.line_count))
            .await?;
        self.channel.send(&format!("position fen {}", request.position)).await?;
        self.channel
            .send(&format!("go movetime {}", request.search_budget_ms))
            .await?;

        self.phase = SessionPhase::Streaming;
        let ceiling = request.search_budget() + self.read_margin;
        let deadline = Instant::now() + ceiling;
        let mut lines = Vec::new();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ChannelError::Timeout(ceiling));
            }

            let raw = match self.channel.receive_line(remaining).await {
                Ok(raw) => raw,
                Err(ChannelError::Timeout(_)) => return Err(ChannelError::Timeout(ceiling)),
                Err(e) => return Err(e),
            };

            match parse_line(&raw) {
                ParsedLine::Analysis(line) => lines.push(line),
                ParsedLine::BestMove(best_move) => {
                    self.phase = SessionPhase::Done;
                    debug!("analysis done: {} after {} lines", best_move, lines.len());
                    return Ok(AnalysisResult::new(best_move, lines));
                }
                ParsedLine::Unrecognized => trace!(target: "uci", "dropped: {}", raw),
            }
        }
    }
}
