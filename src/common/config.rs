//! Configuration for a mini2pc node
//!
//! Layered as defaults, then an optional file (toml or json), then
//! `MINI2PC_*` environment variables. The node binary applies CLI flags on
//! top. Once built, the config is never mutated.

use crate::common::policy::DEFAULT_COMMIT_PROBABILITY;
use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "MINI2PC";

/// Node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node ID, used to label this node's own vote
    pub node_id: String,

    /// Bind address for the HTTP API
    pub bind_addr: SocketAddr,

    /// Base URLs of the other nodes (http(s)://host:port)
    pub peers: Vec<String>,

    /// Chance that this node votes Commit
    pub commit_probability: f64,

    /// Path of the append-only message log
    pub log_path: PathBuf,

    /// fsync after every append
    pub sync_writes: bool,

    /// Wait between DoCommit attempts to an unacknowledging peer
    pub retry_interval_ms: u64,

    /// Per-call timeout for peer requests
    pub request_timeout_ms: u64,

    /// Delay before a participant applies a decision. Off unless set.
    /// Used to exercise a participant dying while a decision is in flight.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apply_delay_ms: Option<u64>,

    /// Logging level
    pub log_level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: "node".to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3001)),
            peers: Vec::new(),
            commit_probability: DEFAULT_COMMIT_PROBABILITY,
            log_path: PathBuf::from("./log.txt"),
            sync_writes: true,
            retry_interval_ms: 15_000,
            request_timeout_ms: 5_000,
            apply_delay_ms: None,
            log_level: "info".to_string(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from an optional file plus the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(env_prefix)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("peers"),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config.normalized())
    }

    /// Trim peer URLs so paths can be appended directly.
    pub fn normalized(mut self) -> Self {
        self.peers = self
            .peers
            .into_iter()
            .map(|p| p.trim().trim_end_matches('/').to_string())
            .collect();
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.node_id.trim().is_empty() {
            return Err(Error::InvalidConfig("node_id cannot be empty".into()));
        }

        if !(0.0..=1.0).contains(&self.commit_probability) {
            return Err(Error::InvalidConfig(format!(
                "commit_probability must be within [0, 1], got {}",
                self.commit_probability
            )));
        }

        if self.peers.iter().any(|p| p.trim().is_empty()) {
            return Err(Error::InvalidConfig("peer address cannot be empty".into()));
        }

        if self.retry_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "retry_interval_ms must be greater than zero".into(),
            ));
        }

        if self.request_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "request_timeout_ms must be greater than zero".into(),
            ));
        }

        // A delayed apply must finish inside the coordinator's DoCommit timeout,
        // otherwise every attempt is cut off before the participant acks
        if let Some(delay) = self.apply_delay_ms {
            if delay >= self.request_timeout_ms {
                return Err(Error::InvalidConfig(format!(
                    "apply_delay_ms ({}) must be less than request_timeout_ms ({})",
                    delay, self.request_timeout_ms
                )));
            }
        }

        Ok(())
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn apply_delay(&self) -> Option<Duration> {
        self.apply_delay_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.commit_probability, 0.8);
        assert_eq!(config.retry_interval(), Duration::from_secs(15));
        assert!(config.apply_delay().is_none());
        assert!(config.peers.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("node.toml");
        std::fs::write(
            &path,
            r#"
node_id = "node-a"
bind_addr = "127.0.0.1:3002"
peers = ["http://localhost:3003/", " http://localhost:3004"]
commit_probability = 1.0
apply_delay_ms = 10000
"#,
        )
        .unwrap();

        let config = NodeConfig::load(Some(&path)).unwrap();
        assert_eq!(config.node_id, "node-a");
        assert_eq!(config.bind_addr, "127.0.0.1:3002".parse().unwrap());
        assert_eq!(
            config.peers,
            vec!["http://localhost:3003", "http://localhost:3004"]
        );
        assert_eq!(config.commit_probability, 1.0);
        assert_eq!(config.apply_delay(), Some(Duration::from_secs(10)));
        // Unset keys keep their defaults
        assert_eq!(config.retry_interval_ms, 15_000);
    }

    #[test]
    fn test_load_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "bind_addr": "127.0.0.1:3001", "peers": ["http://localhost:3002"], "commit_probability": 0.5 }"#,
        )
        .unwrap();

        let config = NodeConfig::load(Some(&path)).unwrap();
        assert_eq!(config.peers, vec!["http://localhost:3002"]);
        assert_eq!(config.commit_probability, 0.5);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let result = NodeConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate() {
        let mut config = NodeConfig {
            commit_probability: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.commit_probability = 0.0;
        assert!(config.validate().is_ok());

        config.peers = vec!["".to_string()];
        assert!(config.validate().is_err());

        config.peers.clear();
        config.retry_interval_ms = 0;
        assert!(config.validate().is_err());

        config.retry_interval_ms = 1;
        config.node_id = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_timeouts() {
        let mut config = NodeConfig {
            request_timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        // The apply delay has to fit inside one DoCommit call
        config.request_timeout_ms = 5_000;
        config.apply_delay_ms = Some(10_000);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        config.apply_delay_ms = Some(5_000);
        assert!(config.validate().is_err());

        config.apply_delay_ms = Some(4_999);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_overrides_file() {
        // Unique prefix so parallel tests loading with MINI2PC never see these
        const PREFIX: &str = "MINI2PC_ENVTEST";

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("node.toml");
        std::fs::write(
            &path,
            r#"
node_id = "from-file"
commit_probability = 0.9
retry_interval_ms = 100
"#,
        )
        .unwrap();

        std::env::set_var("MINI2PC_ENVTEST_NODE_ID", "envnode");
        std::env::set_var("MINI2PC_ENVTEST_PEERS", "http://a:1/,http://b:2");
        std::env::set_var("MINI2PC_ENVTEST_COMMIT_PROBABILITY", "0.25");

        let config = NodeConfig::load_with_prefix(Some(&path), PREFIX);

        std::env::remove_var("MINI2PC_ENVTEST_NODE_ID");
        std::env::remove_var("MINI2PC_ENVTEST_PEERS");
        std::env::remove_var("MINI2PC_ENVTEST_COMMIT_PROBABILITY");

        let config = config.unwrap();
        assert_eq!(config.node_id, "envnode");
        assert_eq!(config.peers, vec!["http://a:1", "http://b:2"]);
        assert_eq!(config.commit_probability, 0.25);
        // Keys only set in the file survive
        assert_eq!(config.retry_interval_ms, 100);
    }
}
