//! UCI output parsing
//!
//! Turns raw engine output lines into structured records. Parsing never
//! fails: anything that is not an analysis line or a best move comes back as
//! [`ParsedLine::Unrecognized`] and is dropped by callers.

use super::analysis::{AnalysisLine, BestMove, Evaluation};

/// Classification of a single engine output line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Analysis(AnalysisLine),
    BestMove(BestMove),
    Unrecognized,
}

/// Parses one line of engine output
pub fn parse_line(line: &str) -> ParsedLine {
    let parts: Vec<&str> = line.split_whitespace().collect();

    match parts.first() {
        Some(&"bestmove") => ParsedLine::BestMove(parse_best_move(parts.get(1).copied())),
        Some(_) => parse_info(&parts)
            .map(ParsedLine::Analysis)
            .unwrap_or(ParsedLine::Unrecognized),
        None => ParsedLine::Unrecognized,
    }
}

fn parse_best_move(token: Option<&str>) -> BestMove {
    match token {
        // "0000" is the UCI null move
        None | Some(BestMove::NONE_TOKEN) | Some("0000") => BestMove::None,
        Some(mv) => BestMove::Move(mv.to_string()),
    }
}

/// Parses: "info depth 10 seldepth 14 multipv 1 score cp 34 nodes 1200 time 15 pv e2e4 e7e5"
fn parse_info(parts: &[&str]) -> Option<AnalysisLine> {
    let mut depth = None;
    let mut rank = 1;
    let mut evaluation = None;
    let mut nodes = None;
    let mut time_ms = None;
    let mut pv: Vec<String> = Vec::new();

    let mut i = 0;
    while i < parts.len() {
        match parts[i] {
            "depth" => {
                depth = Some(parts.get(i + 1)?.parse().ok()?);
                i += 2;
            }
            "multipv" => {
                rank = parts.get(i + 1)?.parse().ok()?;
                i += 2;
            }
            "score" => {
                let value: i32 = parts.get(i + 2)?.parse().ok()?;
                evaluation = match *parts.get(i + 1)? {
                    "cp" => Some(Evaluation::Centipawns(value)),
                    "mate" => Some(Evaluation::Mate(value)),
                    _ => return None,
                };
                i += 3;
            }
            "nodes" => {
                nodes = parts.get(i + 1).and_then(|n| n.parse().ok());
                i += 2;
            }
            "time" => {
                time_ms = parts.get(i + 1).and_then(|t| t.parse().ok());
                i += 2;
            }
            "pv" => {
                // Everything after "pv" is the principal variation
                pv = parts[i + 1..].iter().map(|s| s.to_string()).collect();
                break;
            }
            // Free text runs to the end of the line
            "string" => break,
            _ => {
                i += 1;
            }
        }
    }

    if pv.is_empty() {
        return None;
    }

    Some(AnalysisLine {
        depth: depth?,
        rank,
        evaluation: evaluation?,
        principal_variation: pv,
        nodes,
        time_ms,
    })
}
