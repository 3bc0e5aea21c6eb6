//! tabgate-bridge - line-oriented front end for the coordinator
//!
//! Reads newline-delimited JSON messages (observer reports and host tab
//! notices) on stdin and writes the resulting host calls as
//! newline-delimited JSON on stdout. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use tabgate::coord::hooks::LoggingHook;
use tabgate::coord::{HostCall, HostError, ObserverMessage, TabHost};
use tabgate::{Coordinator, CoordinatorConfig, TabId};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tokio::sync::{oneshot, Mutex};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for tabgate-bridge
#[derive(Parser, Debug)]
#[command(name = "tabgate-bridge")]
#[command(about = "Single-slot video tab coordinator speaking JSON lines")]
#[command(version)]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "TABGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the site URL pattern
    #[arg(long)]
    site_pattern: Option<String>,

    /// Advance the queue when the active tab navigates off the site
    #[arg(long)]
    advance_on_navigate: bool,
}

/// Writes each host call as one JSON line on stdout
struct StdoutHost {
    out: Mutex<Stdout>,
}

impl StdoutHost {
    async fn emit(&self, call: HostCall) -> Result<(), HostError> {
        let mut line = call
            .to_line()
            .map_err(|e| HostError::Rejected(e.to_string()))?;
        line.push('\n');
        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes())
            .await
            .map_err(|e| HostError::Rejected(e.to_string()))?;
        out.flush().await.map_err(|e| HostError::Rejected(e.to_string()))
    }
}

#[async_trait]
impl TabHost for StdoutHost {
    async fn close_tab(&self, tab_id: TabId) -> Result<(), HostError> {
        self.emit(HostCall::CloseTab { tab_id }).await
    }

    async fn focus_tab(&self, tab_id: TabId) -> Result<(), HostError> {
        self.emit(HostCall::FocusTab { tab_id }).await
    }

    async fn send_to_tab(&self, tab_id: TabId, message: ObserverMessage) -> Result<(), HostError> {
        self.emit(HostCall::SendMessage { tab_id, message }).await
    }
}

fn load_config(args: &Args) -> Result<CoordinatorConfig> {
    let mut config = match &args.config {
        Some(path) => CoordinatorConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => CoordinatorConfig::default(),
    };
    if let Some(pattern) = &args.site_pattern {
        config.site_pattern = pattern.clone();
    }
    if args.advance_on_navigate {
        config.advance_on_navigate = true;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing on stderr; stdout carries host calls
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tabgate=info,tabgate_bridge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    info!("Site pattern: {}", config.site_pattern);

    let coordinator = Coordinator::new(&config)
        .context("Failed to create coordinator")?
        .with_hook(Arc::new(LoggingHook));
    let handle = coordinator.handle();
    let host = Arc::new(StdoutHost {
        out: Mutex::new(tokio::io::stdout()),
    });

    let (cancel_tx, cancel_rx) = oneshot::channel();
    let running = tokio::spawn(coordinator.run(host, cancel_rx));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    info!("stdin closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                if let Err(e) = handle.submit_line(&line).await {
                    warn!("Coordinator rejected input: {}", e);
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                let _ = cancel_tx.send(());
                break;
            }
        }
    }

    // Closing the last handle lets the loop drain and exit
    drop(handle);
    running
        .await
        .context("Coordinator task panicked")?
        .context("Coordinator failed")?;
    Ok(())
}
