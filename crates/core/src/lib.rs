//! ChessSight Core Library
//!
//! Position analysis backed by a long-lived UCI engine subprocess.

pub mod config;
pub mod engine;
pub mod error;

pub use config::{EngineConfig, LaunchCandidate};
pub use engine::{AnalysisRequest, AnalysisResult, EngineManager, EngineState, Health};
pub use error::{ChannelError, Error, Result};
