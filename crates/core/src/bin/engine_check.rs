//! Quick check of the local chess engine

use chess_sight_core::{AnalysisRequest, EngineConfig, EngineManager};

const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[tokio::main]
async fn main() {
    let fen = std::env::args().nth(1).unwrap_or_else(|| START_FEN.to_string());
    let config = EngineConfig::from_env();

    println!("Probing {} engine candidates...", config.candidates.len());

    let manager = EngineManager::new(config);
    if let Err(e) = manager.start().await {
        eprintln!("Failed to start engine: {}", e);
        std::process::exit(1);
    }

    println!("Analyzing: {}\n", fen);

    let request = AnalysisRequest::new(fen).search_budget_ms(1000);
    match manager.analyze(&request).await {
        Ok(result) => {
            println!("{}\n", result.summary());
            for line in &result.lines {
                println!(
                    "  #{} depth {:>2}  {:>7}  {}",
                    line.rank,
                    line.depth,
                    line.evaluation.to_string(),
                    line.principal_variation.join(" ")
                );
            }
        }
        Err(e) => {
            eprintln!("Analysis failed: {}", e);
            manager.shutdown().await;
            std::process::exit(1);
        }
    }

    manager.shutdown().await;
}
