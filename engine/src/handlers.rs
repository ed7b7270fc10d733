//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - serve: Run the session server
//! - scores: Show recorded scores
//! - watch: Follow a running session from the directors channel

use anyhow::{Context, Result};
use serde_json::json;

use crate::config::Config;
use crate::console::{self, ConsoleConfig};
use crate::db::Database;
use crate::server::{shutdown_signal, GavelServer};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Run the session server until a shutdown signal arrives
pub async fn handle_serve(mut config: Config, port: Option<u16>) -> Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }

    let server = GavelServer::new(config).await?;
    server.run().await
}

/// Show the most recent scores from the local database
pub async fn handle_scores(limit: usize, config: &Config, format: OutputFormat) -> Result<()> {
    let database = Database::new(&config.database_path())
        .await
        .context("Failed to open database")?;

    let scores = database
        .scores()
        .recent_scores(limit as i64)
        .await
        .context("Failed to fetch scores")?;

    match format {
        OutputFormat::Text => {
            if scores.is_empty() {
                println!("No scores recorded");
            } else {
                println!("Scores (last {}):", limit);
                println!();

                for score in &scores {
                    let submitted = chrono::DateTime::from_timestamp_millis(score.submitted_at)
                        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| "Unknown".to_string());

                    println!(
                        "{}  judge {}  participant {}  round {}",
                        submitted, score.judge_id, score.participant_id, score.round_index
                    );
                    println!(
                        "  creativity {}  execution {}  usability {}",
                        score.creativity, score.execution, score.usability
                    );
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "scores": scores,
                "count": scores.len(),
                "limit": limit
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    database.close().await?;
    Ok(())
}

/// Print every event from the directors channel until Ctrl-C
pub async fn handle_watch(url: String, format: OutputFormat) -> Result<()> {
    let mut events = console::start(ConsoleConfig::new(url));

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match format {
                    OutputFormat::Text => println!("{}", console::describe(&event)),
                    OutputFormat::Json => println!("{}", serde_json::to_string(&event)?),
                }
            }
            _ = &mut shutdown => break,
        }
    }

    Ok(())
}
