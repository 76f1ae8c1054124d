//! Two-phase commit driver
//!
//! One call to [`Coordinator::execute`] runs one transaction to completion:
//!
//! ```text
//! Voting ──► Deciding ──► Committing ──► Applied
//!                    └──► Aborting  ──► Done
//! ```
//!
//! 1. Voting: ask every peer for a vote concurrently, then add our own.
//!    A peer that fails to answer counts as `Abort`.
//! 2. Deciding: `Commit` iff every vote is `Commit`.
//! 3. Committing / Aborting: push the decision to every peer, retrying each
//!    one until it acknowledges. There is no retry cap; once a decision is
//!    made it must reach everyone.
//! 4. Apply the decision to the local log.

use crate::common::{apply_decision, decide, DurableLog, Error, Result, Vote, VotePolicy};
use crate::coordinator::peer_client::PeerTransport;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Voting,
    Deciding,
    Committing,
    Aborting,
    Applied,
    Done,
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionState::Voting => write!(f, "voting"),
            TransactionState::Deciding => write!(f, "deciding"),
            TransactionState::Committing => write!(f, "committing"),
            TransactionState::Aborting => write!(f, "aborting"),
            TransactionState::Applied => write!(f, "applied"),
            TransactionState::Done => write!(f, "done"),
        }
    }
}

/// State of the transaction being coordinated. Lives for one `execute` call.
#[derive(Debug, Clone)]
pub struct Transaction {
    message: String,
    peers: Vec<String>,
    votes: Vec<(String, Vote)>,
    decision: Option<Vote>,
    state: TransactionState,
}

impl Transaction {
    fn new(message: String, peers: Vec<String>) -> Self {
        Self {
            message,
            peers,
            votes: Vec::new(),
            decision: None,
            state: TransactionState::Voting,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    /// Votes in collection order: peers first, then the coordinator.
    pub fn votes(&self) -> &[(String, Vote)] {
        &self.votes
    }

    pub fn decision(&self) -> Option<Vote> {
        self.decision
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    fn decide(&mut self) -> Vote {
        self.state = TransactionState::Deciding;
        let decision = decide(self.votes.iter().map(|(_, vote)| vote));
        self.decision = Some(decision);
        self.state = match decision {
            Vote::Commit => TransactionState::Committing,
            Vote::Abort => TransactionState::Aborting,
        };
        decision
    }

    fn finish(&mut self) {
        self.state = match self.decision {
            Some(Vote::Commit) => TransactionState::Applied,
            _ => TransactionState::Done,
        };
    }
}

pub struct Coordinator<T> {
    node_id: String,
    peers: Vec<String>,
    policy: Arc<dyn VotePolicy>,
    log: Arc<dyn DurableLog>,
    transport: T,
    retry_interval: Duration,
    // One transaction at a time per node
    in_flight: Mutex<()>,
}

impl<T: PeerTransport> Coordinator<T> {
    pub fn new(
        node_id: String,
        peers: Vec<String>,
        policy: Arc<dyn VotePolicy>,
        log: Arc<dyn DurableLog>,
        transport: T,
        retry_interval: Duration,
    ) -> Self {
        Self {
            node_id,
            peers,
            policy,
            log,
            transport,
            retry_interval,
            in_flight: Mutex::new(()),
        }
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    /// Run a transaction and return its decision.
    pub async fn start(&self, message: String) -> Result<Vote> {
        let txn = self.execute(message).await?;
        txn.decision()
            .ok_or_else(|| Error::Internal("transaction finished without a decision".into()))
    }

    /// Run a transaction and return the finished record.
    ///
    /// The only error is a failure to record a `Commit` in the local log,
    /// reported as [`Error::LocalApplyFailed`] after every peer has already
    /// acknowledged the decision.
    pub async fn execute(&self, message: String) -> Result<Transaction> {
        let _guard = self.in_flight.lock().await;

        tracing::info!(
            node = %self.node_id,
            peers = self.peers.len(),
            message = %message,
            "Starting 2PC"
        );

        let mut txn = Transaction::new(message, self.peers.clone());

        // Phase 1: voting
        self.collect_votes(&mut txn).await;
        let decision = txn.decide();
        tracing::info!(node = %self.node_id, decision = %decision, "Decision reached");

        // Phase 2: decision
        self.dispatch(&txn.peers, decision, txn.message()).await;

        match apply_decision(self.log.as_ref(), decision, txn.message()) {
            Ok(true) => {
                tracing::info!(node = %self.node_id, message = %txn.message(), "Committed message")
            }
            Ok(false) => tracing::info!(node = %self.node_id, "Transaction aborted"),
            Err(e) => {
                tracing::error!(
                    node = %self.node_id,
                    decision = %decision,
                    error = %e,
                    "Decision delivered to all peers but local apply failed"
                );
                return Err(Error::LocalApplyFailed {
                    decision,
                    reason: e.to_string(),
                });
            }
        }

        txn.finish();
        Ok(txn)
    }

    async fn collect_votes(&self, txn: &mut Transaction) {
        let polls = txn.peers.iter().map(move |peer| async move {
            match self.transport.can_commit(peer).await {
                Ok(vote) => {
                    tracing::info!(peer = %peer, vote = %vote, "Vote received");
                    vote
                }
                Err(e) => {
                    tracing::warn!(peer = %peer, error = %e, "Peer unreachable, counting as Abort");
                    Vote::Abort
                }
            }
        });
        let peer_votes = join_all(polls).await;

        let peer_votes: Vec<_> = txn.peers.iter().cloned().zip(peer_votes).collect();
        txn.votes.extend(peer_votes);

        let own = self.policy.vote();
        tracing::info!(node = %self.node_id, vote = %own, "Own vote");
        txn.votes.push((self.node_id.clone(), own));
    }

    async fn dispatch(&self, peers: &[String], decision: Vote, message: &str) {
        let deliveries = peers
            .iter()
            .map(|peer| self.deliver(peer, decision, message));
        let attempts = join_all(deliveries).await;

        let retried = attempts.iter().filter(|n| **n > 1).count();
        tracing::debug!(
            node = %self.node_id,
            peers = attempts.len(),
            retried,
            "Decision acknowledged by all peers"
        );
    }

    /// Send the decision to one peer until it acknowledges. Returns the
    /// number of attempts made.
    async fn deliver(&self, peer: &str, decision: Vote, message: &str) -> u32 {
        let mut attempt = 1;
        loop {
            match self.transport.do_commit(peer, decision, message).await {
                Ok(()) => {
                    tracing::info!(peer = %peer, decision = %decision, attempt, "Decision acknowledged");
                    return attempt;
                }
                Err(e) => {
                    tracing::warn!(
                        peer = %peer,
                        attempt,
                        error = %e,
                        retry_in_ms = self.retry_interval.as_millis() as u64,
                        "Decision not acknowledged, retrying"
                    );
                    tokio::time::sleep(self.retry_interval).await;
                    attempt += 1;
                }
            }
        }
    }
}
