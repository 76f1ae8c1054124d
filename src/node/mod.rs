//! A runnable node: participant and coordinator behind one HTTP server

pub mod http;
pub mod server;

pub use http::{create_router, NodeState};
pub use server::Node;
