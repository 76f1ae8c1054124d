//! Calls from a coordinator to its peers

use crate::common::{Error, Result, Vote};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanCommitResponse {
    pub vote: Vote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoCommitRequest {
    pub decision: Vote,
    pub message: String,
}

/// How a coordinator reaches its participants.
///
/// Implementations must bound each call with a timeout so a silent peer
/// cannot stall the vote phase.
pub trait PeerTransport: Send + Sync {
    /// Ask `peer` for its vote.
    fn can_commit(&self, peer: &str) -> impl Future<Output = Result<Vote>> + Send;

    /// Deliver the decision to `peer`. `Ok` means acknowledged.
    fn do_commit(
        &self,
        peer: &str,
        decision: Vote,
        message: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// HTTP+JSON peer client
#[derive(Clone)]
pub struct HttpPeerClient {
    client: reqwest::Client,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    fn url(peer: &str, path: &str) -> String {
        format!("{}/{}", peer.trim_end_matches('/'), path)
    }
}

impl PeerTransport for HttpPeerClient {
    async fn can_commit(&self, peer: &str) -> Result<Vote> {
        let unreachable = |reason: String| Error::PeerUnreachable {
            peer: peer.to_string(),
            reason,
        };

        let response = self
            .client
            .post(Self::url(peer, "canCommit"))
            .send()
            .await
            .map_err(|e| unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(unreachable(format!("status {}", response.status())));
        }

        let body: CanCommitResponse = response
            .json()
            .await
            .map_err(|e| unreachable(e.to_string()))?;
        Ok(body.vote)
    }

    async fn do_commit(&self, peer: &str, decision: Vote, message: &str) -> Result<()> {
        let unacknowledged = |reason: String| Error::PeerUnacknowledged {
            peer: peer.to_string(),
            reason,
        };

        let request = DoCommitRequest {
            decision,
            message: message.to_string(),
        };

        let response = self
            .client
            .post(Self::url(peer, "doCommit"))
            .json(&request)
            .send()
            .await
            .map_err(|e| unacknowledged(e.to_string()))?;

        if !response.status().is_success() {
            return Err(unacknowledged(format!("status {}", response.status())));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join() {
        assert_eq!(
            HttpPeerClient::url("http://localhost:3002/", "canCommit"),
            "http://localhost:3002/canCommit"
        );
        assert_eq!(
            HttpPeerClient::url("http://localhost:3002", "doCommit"),
            "http://localhost:3002/doCommit"
        );
    }

    #[tokio::test]
    async fn test_unreachable_peer_is_error() {
        // Grab a free port, then release it so nothing is listening there
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let peer = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = HttpPeerClient::new(Duration::from_millis(200)).unwrap();
        let err = client.can_commit(&peer).await.unwrap_err();
        assert!(matches!(err, Error::PeerUnreachable { .. }));

        let err = client
            .do_commit(&peer, Vote::Commit, "m")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PeerUnacknowledged { .. }));
    }
}
