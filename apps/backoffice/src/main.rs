//! # Stockbook Entry Point
//!
//! Reads one JSON command per line from stdin and writes one JSON envelope
//! per line to stdout:
//!
//! ```text
//! $ echo '{"command":"checkStockAlerts"}' | stockbook
//! {"success":true,"data":[]}
//! ```

use std::process::ExitCode;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};

use stockbook_backoffice::commands::handle_line;
use stockbook_backoffice::config::BackofficeConfig;
use stockbook_backoffice::error::{ActionResult, ApiError};
use stockbook_backoffice::{bootstrap, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match BackofficeConfig::load() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let state = match bootstrap(&config).await {
        Ok(state) => state,
        Err(err) => {
            error!(error = %err, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    info!("Stockbook ready, reading commands from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                error!(error = %err, "Failed to read stdin");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let reply = handle_line(&state, &line).await;
        let encoded = serde_json::to_string(&reply).unwrap_or_else(|err| {
            let fallback = ActionResult::err(ApiError::internal(err.to_string()));
            serde_json::to_string(&fallback).unwrap_or_default()
        });

        if let Err(err) = write_reply(&mut stdout, &encoded).await {
            error!(error = %err, "Failed to write reply");
            break;
        }
    }

    state.db().close().await;
    info!("Stockbook stopped");
    ExitCode::SUCCESS
}

async fn write_reply(stdout: &mut tokio::io::Stdout, reply: &str) -> std::io::Result<()> {
    stdout.write_all(reply.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}
