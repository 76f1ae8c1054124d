//! Votes and the unanimity rule

use serde::{Deserialize, Serialize};

/// A node's stance on a transaction. Decisions use the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vote {
    Commit,
    Abort,
}

impl Vote {
    pub fn is_commit(&self) -> bool {
        matches!(self, Vote::Commit)
    }
}

impl std::fmt::Display for Vote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Vote::Commit => write!(f, "Commit"),
            Vote::Abort => write!(f, "Abort"),
        }
    }
}

/// Compute the decision for a set of votes.
///
/// `Commit` iff every vote is `Commit`. A single `Abort` anywhere aborts
/// the transaction.
pub fn decide<'a, I>(votes: I) -> Vote
where
    I: IntoIterator<Item = &'a Vote>,
{
    if votes.into_iter().all(Vote::is_commit) {
        Vote::Commit
    } else {
        Vote::Abort
    }
}
