//! Vote policies
//!
//! A policy decides how this node votes when asked whether a transaction
//! may commit. The coordinator's self-vote goes through the same policy as
//! the participant's answer to `canCommit`.

use crate::common::Vote;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Default chance of voting `Commit`
pub const DEFAULT_COMMIT_PROBABILITY: f64 = 0.8;

pub trait VotePolicy: Send + Sync {
    fn vote(&self) -> Vote;
}

/// Votes `Commit` with a fixed probability.
pub struct ProbabilisticVotePolicy {
    commit_probability: f64,
    rng: Mutex<StdRng>,
}

impl ProbabilisticVotePolicy {
    pub fn new(commit_probability: f64) -> Self {
        Self::with_rng(commit_probability, StdRng::from_entropy())
    }

    /// Reproducible vote sequence for a given seed
    pub fn with_seed(commit_probability: f64, seed: u64) -> Self {
        Self::with_rng(commit_probability, StdRng::seed_from_u64(seed))
    }

    fn with_rng(commit_probability: f64, rng: StdRng) -> Self {
        let commit_probability = if commit_probability.is_nan() {
            0.0
        } else {
            commit_probability.clamp(0.0, 1.0)
        };
        Self {
            commit_probability,
            rng: Mutex::new(rng),
        }
    }

    pub fn commit_probability(&self) -> f64 {
        self.commit_probability
    }
}

impl Default for ProbabilisticVotePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_COMMIT_PROBABILITY)
    }
}

impl VotePolicy for ProbabilisticVotePolicy {
    fn vote(&self) -> Vote {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        if rng.gen_bool(self.commit_probability) {
            Vote::Commit
        } else {
            Vote::Abort
        }
    }
}

/// Replays a fixed sequence of votes, wrapping around at the end.
pub struct FixedVotePolicy {
    votes: Vec<Vote>,
    next: AtomicUsize,
}

impl FixedVotePolicy {
    pub fn new(votes: Vec<Vote>) -> Self {
        Self {
            votes,
            next: AtomicUsize::new(0),
        }
    }

    pub fn always(vote: Vote) -> Self {
        Self::new(vec![vote])
    }
}

impl VotePolicy for FixedVotePolicy {
    fn vote(&self) -> Vote {
        if self.votes.is_empty() {
            return Vote::Abort;
        }
        let i = self.next.fetch_add(1, Ordering::Relaxed);
        self.votes[i % self.votes.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_bounds() {
        let always = ProbabilisticVotePolicy::new(1.0);
        let never = ProbabilisticVotePolicy::new(0.0);
        for _ in 0..200 {
            assert_eq!(always.vote(), Vote::Commit);
            assert_eq!(never.vote(), Vote::Abort);
        }
    }

    #[test]
    fn test_probability_clamped() {
        assert_eq!(ProbabilisticVotePolicy::new(7.5).commit_probability(), 1.0);
        assert_eq!(ProbabilisticVotePolicy::new(-1.0).commit_probability(), 0.0);
        assert_eq!(ProbabilisticVotePolicy::new(f64::NAN).commit_probability(), 0.0);
    }

    #[test]
    fn test_seeded_policy_is_reproducible() {
        let a = ProbabilisticVotePolicy::with_seed(0.5, 42);
        let b = ProbabilisticVotePolicy::with_seed(0.5, 42);
        let va: Vec<Vote> = (0..64).map(|_| a.vote()).collect();
        let vb: Vec<Vote> = (0..64).map(|_| b.vote()).collect();
        assert_eq!(va, vb);
        assert!(va.contains(&Vote::Commit));
        assert!(va.contains(&Vote::Abort));
    }

    #[test]
    fn test_default_distribution() {
        let policy = ProbabilisticVotePolicy::with_seed(DEFAULT_COMMIT_PROBABILITY, 7);
        let commits = (0..10_000).filter(|_| policy.vote().is_commit()).count();
        assert!((7_500..8_500).contains(&commits), "commits = {}", commits);
    }

    #[test]
    fn test_fixed_sequence_cycles() {
        let policy = FixedVotePolicy::new(vec![Vote::Commit, Vote::Abort]);
        assert_eq!(policy.vote(), Vote::Commit);
        assert_eq!(policy.vote(), Vote::Abort);
        assert_eq!(policy.vote(), Vote::Commit);
    }

    #[test]
    fn test_fixed_empty_aborts() {
        assert_eq!(FixedVotePolicy::new(Vec::new()).vote(), Vote::Abort);
        assert_eq!(FixedVotePolicy::always(Vote::Commit).vote(), Vote::Commit);
    }
}
