//! Conclave CLI - run council cycles from the command line.
//!
//! Ships a local echo backend so cycles can be exercised end to end
//! without a model transport, and a JSONL ledger sink that appends one
//! record per cycle.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use tracing::warn;

use conclave_core::{
    AgentBackend, BackendError, BackendReply, ConsensusMode, Council, CouncilConfig, CycleSink,
    LogRecord, Role,
};

#[derive(Parser)]
#[command(name = "conclave")]
#[command(about = "Conclave - multi-role AI consensus council")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Submit a query to the council and print the outcome
    Ask {
        /// The query
        query: String,
        /// Configuration file path (JSON); defaults to the standard
        /// four-seat council
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Consensus mode override (majority_vote, confidence_scoring,
        /// weighted_roles, deliberative_loop, hybrid)
        #[arg(short, long)]
        mode: Option<ConsensusMode>,
        /// Append one JSON record per cycle to this file
        #[arg(long)]
        ledger: Option<PathBuf>,
        /// Print the full cycle result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check configuration validity
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "config/conclave.json")]
        config: PathBuf,
    },
    /// Show council status for a configuration
    Status {
        /// Configuration file path; defaults to the standard council
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Stand-in backend: echoes the query back under each role's name.
/// Real deployments provide a model transport instead.
struct EchoBackend;

#[async_trait::async_trait]
impl AgentBackend for EchoBackend {
    async fn invoke(&self, _role: &Role, prompt: &str) -> Result<BackendReply, BackendError> {
        Ok(BackendReply::new(format!("Echo: {prompt}")).with_confidence(0.8))
    }
}

/// Appends one JSON line per cycle record.
struct JsonlSink {
    file: Mutex<File>,
}

impl JsonlSink {
    fn open(path: &PathBuf) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening ledger {}", path.display()))?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl CycleSink for JsonlSink {
    fn record(&self, record: &LogRecord) {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "failed to serialize cycle record");
                return;
            }
        };
        let mut file = self.file.lock().unwrap_or_else(|p| p.into_inner());
        if let Err(err) = writeln!(file, "{line}") {
            warn!(error = %err, "failed to append cycle record");
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<CouncilConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing config {}", path.display()))
        }
        None => Ok(CouncilConfig::standard_council()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match cli.command {
        Some(Commands::Ask {
            query,
            config,
            mode,
            ledger,
            json,
        }) => {
            let config = load_config(config.as_ref())?;
            let mut council = Council::new(&config, Arc::new(EchoBackend))?;
            if let Some(path) = &ledger {
                council = council.with_sink(Box::new(JsonlSink::open(path)?));
            }

            let result = council.submit_with_mode(&query, mode).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
                return Ok(());
            }
            match &result.final_response {
                Some(response) => {
                    println!("{response}");
                    if result.low_confidence {
                        println!("\n[low confidence: council divergence stayed over the ceiling]");
                    }
                }
                None => println!("Cycle ended without a response: {}", result.outcome.label()),
            }
            for event in &result.security_events {
                println!("[security] {event}");
            }
        }
        Some(Commands::Check { config }) => {
            let config = load_config(Some(&config))?;
            let council = Council::new(&config, Arc::new(EchoBackend))?;
            let status = council.status();
            println!(
                "Config OK: {} role(s): {}",
                status.registered_roles.len(),
                status.registered_roles.join(", ")
            );
        }
        Some(Commands::Status { config }) => {
            let config = load_config(config.as_ref())?;
            let council = Council::new(&config, Arc::new(EchoBackend))?;
            let status = council.status();
            println!("State: {}", status.state);
            println!("Roles: {}", status.registered_roles.join(", "));
            match status.last_cycle_summary {
                Some(summary) => println!(
                    "Last cycle: {} ({})",
                    summary.cycle_id,
                    summary.outcome.label()
                ),
                None => println!("Last cycle: none"),
            }
        }
        None => {
            println!("Conclave v0.1.0 - Use --help for commands");
        }
    }

    Ok(())
}
