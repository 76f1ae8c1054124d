//! Common utilities and types shared across mini2pc

pub mod config;
pub mod error;
pub mod policy;
pub mod storage;
pub mod tracing_middleware;
pub mod utils;
pub mod vote;

pub use config::NodeConfig;
pub use error::{Error, Result};
pub use policy::{FixedVotePolicy, ProbabilisticVotePolicy, VotePolicy};
pub use storage::{apply_decision, DurableLog, FileLog, MemoryLog};
pub use utils::{default_message, parse_duration};
pub use vote::{decide, Vote};
