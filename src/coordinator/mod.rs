//! Coordinator role
//!
//! The coordinator is responsible for:
//! - Collecting votes from every peer and itself
//! - Computing the unanimous decision
//! - Delivering the decision to every peer until acknowledged
//! - Applying the decision locally

pub mod driver;
pub mod peer_client;

pub use driver::{Coordinator, Transaction, TransactionState};
pub use peer_client::{HttpPeerClient, PeerTransport};
