//! # mini2pc
//!
//! Two-phase commit between peer nodes agreeing on whether to durably record
//! a message:
//! - Any node can coordinate a transaction
//! - Unanimous vote decides Commit, anything else Aborts
//! - Decisions are retried until every peer acknowledges
//! - Committed messages land in an append-only log
//!
//! ## Architecture
//!
//! ```text
//!        POST /start
//!             │
//!      ┌──────▼───────┐   canCommit / doCommit   ┌──────────────┐
//!      │   Node A     │─────────────────────────►│   Node B     │
//!      │ (coordinator)│◄─────────────────────────│ (participant)│
//!      │  + log.txt   │        vote / ack        │  + log.txt   │
//!      └──────┬───────┘                          └──────────────┘
//!             │ canCommit / doCommit
//!      ┌──────▼───────┐
//!      │   Node C     │
//!      │ (participant)│
//!      │  + log.txt   │
//!      └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Start nodes
//! ```bash
//! mini2pc-node serve --id a --bind 127.0.0.1:3001 \
//!   --peers http://127.0.0.1:3002,http://127.0.0.1:3003
//! mini2pc-node serve --id b --bind 127.0.0.1:3002 \
//!   --peers http://127.0.0.1:3001,http://127.0.0.1:3003
//! ```
//!
//! ### Run a transaction
//! ```bash
//! mini2pc --node http://127.0.0.1:3001 start "hello"
//! mini2pc --node http://127.0.0.1:3002 log
//! ```

pub mod common;
pub mod coordinator;
pub mod node;
pub mod participant;

// Re-export commonly used types
pub use common::{Error, NodeConfig, Result, Vote};
pub use coordinator::Coordinator;
pub use node::Node;
pub use participant::Participant;

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
