//! Node server

use crate::common::{FileLog, NodeConfig, ProbabilisticVotePolicy, Result, VotePolicy};
use crate::coordinator::{Coordinator, HttpPeerClient};
use crate::node::http::{create_router, NodeState};
use crate::participant::Participant;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct Node {
    config: NodeConfig,
}

impl Node {
    pub fn new(config: NodeConfig) -> Self {
        Self { config }
    }

    /// Build the shared components from the config.
    ///
    /// The vote policy and the log are shared by both roles.
    pub fn build_state(&self) -> Result<NodeState> {
        self.config.validate()?;

        let policy: Arc<dyn VotePolicy> =
            Arc::new(ProbabilisticVotePolicy::new(self.config.commit_probability));
        let log = Arc::new(FileLog::open(&self.config.log_path, self.config.sync_writes)?);

        let participant = Participant::new(self.config.node_id.clone(), policy.clone(), log.clone())
            .with_apply_delay(self.config.apply_delay());

        let coordinator = Coordinator::new(
            self.config.node_id.clone(),
            self.config.peers.clone(),
            policy,
            log.clone(),
            HttpPeerClient::new(self.config.request_timeout())?,
            self.config.retry_interval(),
        );

        Ok(NodeState {
            node_id: self.config.node_id.clone(),
            commit_probability: self.config.commit_probability,
            participant: Arc::new(participant),
            coordinator: Arc::new(coordinator),
            log,
        })
    }

    /// Bind the configured address and serve until Ctrl-C.
    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let state = self.build_state()?;

        tracing::info!("Starting node: {}", self.config.node_id);
        tracing::info!("  HTTP API: {}", listener.local_addr()?);
        tracing::info!("  Log path: {}", self.config.log_path.display());
        tracing::info!("  Commit probability: {}", self.config.commit_probability);
        if self.config.peers.is_empty() {
            tracing::info!("  Peers: none");
        } else {
            tracing::info!("  Peers: {}", self.config.peers.join(", "));
        }
        if let Some(delay) = self.config.apply_delay() {
            tracing::warn!("  Apply delay: {:?} (crash-in-flight testing)", delay);
        }

        let router = create_router(state);

        tracing::info!("✓ Node ready, POST /start to begin a transaction");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Node stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
