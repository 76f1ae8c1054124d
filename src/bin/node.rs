//! Node binary

use clap::{Parser, Subcommand};
use mini2pc::common::parse_duration;
use mini2pc::{Node, NodeConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mini2pc-node")]
#[command(about = "mini2pc node: two-phase commit participant and coordinator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start node server
    Serve {
        /// Config file (toml or json)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Node ID
        #[arg(long)]
        id: Option<String>,

        /// Bind address for HTTP
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Peer base URLs (comma-separated)
        #[arg(long, value_delimiter = ',')]
        peers: Option<Vec<String>>,

        /// Chance of voting Commit, in [0, 1]
        #[arg(long)]
        commit_probability: Option<f64>,

        /// Message log file
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Wait between decision retries (e.g. "15s", "500ms")
        #[arg(long)]
        retry_interval: Option<String>,

        /// Timeout for each peer request
        #[arg(long)]
        request_timeout: Option<String>,

        /// Delay before applying each received decision
        #[arg(long)]
        apply_delay: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            id,
            bind,
            peers,
            commit_probability,
            log_file,
            retry_interval,
            request_timeout,
            apply_delay,
        } => {
            // Load config from file and environment, then override with CLI arguments
            let mut node_config = NodeConfig::load(config.as_deref())?;
            if let Some(id) = id {
                node_config.node_id = id;
            }
            if let Some(bind) = bind {
                node_config.bind_addr = bind;
            }
            if let Some(peers) = peers {
                node_config.peers = peers;
            }
            if let Some(p) = commit_probability {
                node_config.commit_probability = p;
            }
            if let Some(path) = log_file {
                node_config.log_path = path;
            }
            if let Some(s) = retry_interval {
                node_config.retry_interval_ms = parse_duration(&s)?.as_millis() as u64;
            }
            if let Some(s) = request_timeout {
                node_config.request_timeout_ms = parse_duration(&s)?.as_millis() as u64;
            }
            if let Some(s) = apply_delay {
                node_config.apply_delay_ms = Some(parse_duration(&s)?.as_millis() as u64);
            }
            let node_config = node_config.normalized();
            node_config.validate()?;

            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| node_config.log_level.clone().into()),
                )
                .with(tracing_subscriber::fmt::layer())
                .init();

            Node::new(node_config).serve().await?;
        }
    }

    Ok(())
}
