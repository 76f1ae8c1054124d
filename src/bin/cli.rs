//! CLI for talking to a running node

use clap::{Parser, Subcommand};
use mini2pc::node::http::StartResponse;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "mini2pc")]
#[command(about = "mini2pc two-phase commit CLI")]
#[command(version)]
struct Cli {
    /// Node URL
    #[arg(long, default_value = "http://localhost:3001")]
    node: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a transaction with the node as coordinator
    Start {
        /// Message to record (generated if omitted)
        message: Option<String>,
    },

    /// Show the node's committed messages
    Log,

    /// Show node health
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let base = cli.node.trim_end_matches('/');
    // No timeout: a transaction waits for every peer to acknowledge
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Start { message } => {
            let body = match message {
                Some(m) => json!({ "message": m }),
                None => json!({}),
            };
            let resp = client
                .post(format!("{}/start", base))
                .json(&body)
                .send()
                .await?;
            if resp.status().is_success() {
                let result: StartResponse = resp.json().await?;
                println!("Decision: {}", result.decision);
            } else {
                let status = resp.status();
                let error: Value = resp.json().await.unwrap_or(Value::Null);
                anyhow::bail!("transaction failed ({}): {}", status, error);
            }
        }

        Commands::Log => {
            let resp: Value = client
                .get(format!("{}/log", base))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            if let Some(entries) = resp.get("entries").and_then(Value::as_array) {
                println!("{} committed message(s):", entries.len());
                for entry in entries {
                    println!("  {}", entry.as_str().unwrap_or_default());
                }
            }
        }

        Commands::Health => {
            let resp: Value = client
                .get(format!("{}/health", base))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }
    }

    Ok(())
}
