//! BioViz backend binary - composition root.
//!
//! Ties the workspace together into the process the desktop shell launches:
//! 1. Load configuration from TOML
//! 2. Register the built-in capability set
//! 3. Construct the authorization gateway
//! 4. Start the proposal expiry sweeper
//! 5. Serve a line-delimited JSON bridge on stdin/stdout
//!
//! Logging goes to stderr; stdout carries only bridge responses.

mod cli;

use std::sync::Arc;

use clap::Parser;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use uuid::Uuid;

use bioviz_core::config::BiovizConfig;
use bioviz_gateway::{AmbientContext, CapabilityRegistry, Gateway, ModelReply, RiskLevel};

use cli::CliArgs;

/// One request from the desktop shell.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum BridgeRequest {
    /// Classify a model reply into a decision.
    Decide {
        reply: ModelReply,
        #[serde(default)]
        context: AmbientContext,
    },
    /// Execute a stored proposal after user approval.
    Confirm {
        proposal_id: Uuid,
        #[serde(default)]
        context: AmbientContext,
    },
    /// Cancel a stored proposal.
    Reject { proposal_id: Uuid },
    /// List capability names, optionally filtered by risk level.
    Capabilities {
        #[serde(default)]
        risk: Option<RiskLevel>,
    },
    /// Export function-calling schemas for the model client.
    Schemas,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config first so the CLI can override its log level.
    let config_file = args.resolve_config_path();
    let mut config = BiovizConfig::load_or_default(&config_file);
    if let Some(ttl) = args.proposal_ttl {
        config.gateway.proposal_ttl_seconds = ttl;
    }

    // Tracing to stderr; stdout belongs to the bridge.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting BioViz backend v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration resolved");

    // Capability registration failures are startup configuration errors and
    // abort the process.
    let mut registry = CapabilityRegistry::new();
    bioviz_tools::register_defaults(&mut registry, &config.analysis)?;

    let gateway = Arc::new(Gateway::new(registry, config.gateway));

    // Background expiry sweep for abandoned proposals.
    let sweeper = Arc::new(gateway.sweeper());
    let sweep_task = {
        let sweeper = Arc::clone(&sweeper);
        tokio::spawn(async move { sweeper.run().await })
    };

    serve_stdio(&gateway).await?;

    tracing::info!("Bridge closed; shutting down");
    sweeper.shutdown();
    let _ = sweep_task.await;
    Ok(())
}

/// Serve bridge requests from stdin until EOF.
async fn serve_stdio(gateway: &Gateway) -> std::io::Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(gateway, &line).await;
        stdout.write_all(response.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }
    Ok(())
}

/// Handle one bridge line. Malformed input gets an error line, never a crash.
async fn handle_line(gateway: &Gateway, line: &str) -> String {
    let request: BridgeRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected malformed bridge request");
            return serde_json::json!({"error": format!("invalid request: {}", e)}).to_string();
        }
    };

    let response = match request {
        BridgeRequest::Decide { reply, context } => {
            let decision = gateway.decide(&reply.into_request(), &context).await;
            serde_json::to_value(decision)
        }
        BridgeRequest::Confirm {
            proposal_id,
            context,
        } => {
            let decision = gateway.confirm(proposal_id, &context).await;
            serde_json::to_value(decision)
        }
        BridgeRequest::Reject { proposal_id } => serde_json::to_value(gateway.reject(proposal_id)),
        BridgeRequest::Capabilities { risk } => {
            Ok(serde_json::json!({"capabilities": gateway.list_capabilities(risk)}))
        }
        BridgeRequest::Schemas => Ok(serde_json::json!({"schemas": gateway.export_schemas()})),
    };

    match response {
        Ok(value) => value.to_string(),
        Err(e) => serde_json::json!({"error": format!("serialization failed: {}", e)}).to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
