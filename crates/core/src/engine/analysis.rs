//! Types for representing analysis requests and results

use std::fmt;
use std::time::Duration;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Error, Result};

const DEFAULT_SEARCH_BUDGET_MS: u64 = 3000;
const DEFAULT_LINE_COUNT: u32 = 3;

/// One analysis request as accepted from callers
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnalysisRequest {
    /// Position to analyze, as FEN
    #[serde(rename = "fen", alias = "position")]
    pub position: String,
    /// Search time handed to the engine (milliseconds)
    #[serde(rename = "movetime", alias = "searchBudgetMs", default = "default_search_budget_ms")]
    pub search_budget_ms: u64,
    /// Number of candidate lines (engine MultiPV)
    #[serde(rename = "multipv", alias = "lineCount", default = "default_line_count")]
    pub line_count: u32,
}

fn default_search_budget_ms() -> u64 {
    DEFAULT_SEARCH_BUDGET_MS
}

fn default_line_count() -> u32 {
    DEFAULT_LINE_COUNT
}

impl AnalysisRequest {
    /// Creates a request with the default budget and line count
    pub fn new(position: impl Into<String>) -> Self {
        Self {
            position: position.into(),
            search_budget_ms: DEFAULT_SEARCH_BUDGET_MS,
            line_count: DEFAULT_LINE_COUNT,
        }
    }

    pub fn search_budget_ms(mut self, ms: u64) -> Self {
        self.search_budget_ms = ms;
        self
    }

    pub fn line_count(mut self, count: u32) -> Self {
        self.line_count = count;
        self
    }

    pub fn search_budget(&self) -> Duration {
        Duration::from_millis(self.search_budget_ms)
    }

    /// Checks the request before anything is written to the engine.
    ///
    /// The FEN itself is not interpreted here, but it is written verbatim
    /// into a protocol line, so it must not carry line terminators.
    pub fn validate(&self) -> Result<()> {
        if self.position.trim().is_empty() {
            return Err(Error::InvalidRequest("position must not be empty".into()));
        }
        if self.position.contains(['\n', '\r']) {
            return Err(Error::InvalidRequest(
                "position must be a single line".into(),
            ));
        }
        if self.search_budget_ms == 0 {
            return Err(Error::InvalidRequest("movetime must be positive".into()));
        }
        if self.line_count == 0 {
            return Err(Error::InvalidRequest("multipv must be at least 1".into()));
        }
        Ok(())
    }
}

/// Represents a position evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Centipawn score from the side to move
    Centipawns(i32),
    /// Forced mate in N moves (negative = side to move is getting mated)
    Mate(i32),
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Centipawns(cp) => {
                let score = *cp as f32 / 100.0;
                if score >= 0.0 {
                    write!(f, "+{:.2}", score)
                } else {
                    write!(f, "{:.2}", score)
                }
            }
            Evaluation::Mate(moves) => write!(f, "M{}", moves),
        }
    }
}

/// One principal variation reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisLine {
    /// Search depth the line was reported at
    pub depth: u32,
    /// 1-based MultiPV index
    pub rank: u32,
    pub evaluation: Evaluation,
    /// Moves in UCI notation; never empty
    pub principal_variation: Vec<String>,
    pub nodes: Option<u64>,
    pub time_ms: Option<u64>,
}

impl AnalysisLine {
    /// First move of the variation
    pub fn best_move(&self) -> &str {
        self.principal_variation
            .first()
            .map(String::as_str)
            .unwrap_or_default()
    }
}

impl Serialize for AnalysisLine {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("depth", &self.depth)?;
        map.serialize_entry("multipv", &self.rank)?;
        match self.evaluation {
            Evaluation::Centipawns(cp) => map.serialize_entry("score", &cp)?,
            Evaluation::Mate(moves) => map.serialize_entry("mate", &moves)?,
        }
        map.serialize_entry("pv", &self.principal_variation.join(" "))?;
        map.serialize_entry("move", self.best_move())?;
        if let Some(nodes) = self.nodes {
            map.serialize_entry("nodes", &nodes)?;
        }
        if let Some(time) = self.time_ms {
            map.serialize_entry("time", &time)?;
        }
        map.end()
    }
}

/// Terminal move of a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestMove {
    Move(String),
    /// The engine reported no legal move (mate or stalemate)
    None,
}

impl BestMove {
    pub const NONE_TOKEN: &'static str = "(none)";

    pub fn as_str(&self) -> &str {
        match self {
            BestMove::Move(mv) => mv,
            BestMove::None => Self::NONE_TOKEN,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, BestMove::None)
    }
}

impl fmt::Display for BestMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BestMove {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Aggregated result of one analysis request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    #[serde(rename = "bestmove")]
    pub best_move: BestMove,
    /// First line received, if any
    #[serde(rename = "evaluation", serialize_with = "serialize_primary")]
    pub primary_evaluation: Option<AnalysisLine>,
    /// Lines in arrival order (not sorted by rank)
    pub lines: Vec<AnalysisLine>,
}

impl AnalysisResult {
    pub fn new(best_move: BestMove, lines: Vec<AnalysisLine>) -> Self {
        Self {
            best_move,
            primary_evaluation: lines.first().cloned(),
            lines,
        }
    }

    /// Returns a brief summary of the analysis
    pub fn summary(&self) -> String {
        match &self.primary_evaluation {
            Some(line) => format!(
                "Eval: {} | Best: {} | Depth: {} | PV: {}",
                line.evaluation,
                self.best_move,
                line.depth,
                line.principal_variation.iter().take(5).cloned().collect::<Vec<_>>().join(" ")
            ),
            None => format!("Best: {} | no lines reported", self.best_move),
        }
    }
}

// An absent primary line is sent as `{}` so clients can always index into it.
fn serialize_primary<S: Serializer>(
    primary: &Option<AnalysisLine>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match primary {
        Some(line) => line.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}
