//! Participant role
//!
//! Answers another node's coordinator:
//! - `canCommit`: vote via the local policy, no side effects
//! - `doCommit`: apply the announced decision to the local log

use crate::common::{apply_decision, DurableLog, Result, Vote, VotePolicy};
use std::sync::Arc;
use std::time::Duration;

pub struct Participant {
    node_id: String,
    policy: Arc<dyn VotePolicy>,
    log: Arc<dyn DurableLog>,
    apply_delay: Option<Duration>,
}

impl Participant {
    pub fn new(node_id: String, policy: Arc<dyn VotePolicy>, log: Arc<dyn DurableLog>) -> Self {
        Self {
            node_id,
            policy,
            log,
            apply_delay: None,
        }
    }

    /// Wait this long before applying each decision.
    pub fn with_apply_delay(mut self, delay: Option<Duration>) -> Self {
        self.apply_delay = delay;
        self
    }

    pub fn can_commit(&self) -> Vote {
        let vote = self.policy.vote();
        tracing::info!(node = %self.node_id, vote = %vote, "Voting");
        vote
    }

    /// Apply a decision received from a coordinator.
    ///
    /// `Ok` is the acknowledgment. A store failure is returned as-is and
    /// never retried here; the coordinator will send the decision again.
    pub async fn do_commit(&self, decision: Vote, message: &str) -> Result<()> {
        tracing::info!(node = %self.node_id, decision = %decision, "Decision received from coordinator");

        if let Some(delay) = self.apply_delay {
            tracing::debug!(node = %self.node_id, delay_ms = delay.as_millis() as u64, "Delaying apply");
            tokio::time::sleep(delay).await;
        }

        match apply_decision(self.log.as_ref(), decision, message) {
            Ok(true) => {
                tracing::info!(node = %self.node_id, message = %message, "Committed message");
                Ok(())
            }
            Ok(false) => {
                tracing::info!(node = %self.node_id, "Transaction aborted");
                Ok(())
            }
            Err(e) => {
                tracing::error!(node = %self.node_id, error = %e, "Failed to write to log");
                Err(e)
            }
        }
    }
}
