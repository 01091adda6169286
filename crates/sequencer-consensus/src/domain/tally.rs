//! Weighted vote tallying against the BFT threshold.
//!
//! The threshold is kept as an exact rational so comparisons never suffer
//! floating-point edge cases: 66/100 weighted accept must not pass a 2/3
//! threshold, and the reported `f64` fractions are derived values only.

use crate::domain::Vote;
use serde::{Deserialize, Serialize};
use shared_types::{Address, Hash};
use std::collections::HashMap;

/// The weighted BFT threshold as an exact fraction of total eligible weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusThreshold {
    pub numerator: u32,
    pub denominator: u32,
}

impl Default for ConsensusThreshold {
    /// The classic BFT supermajority: 2/3.
    fn default() -> Self {
        Self {
            numerator: 2,
            denominator: 3,
        }
    }
}

impl ConsensusThreshold {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        assert!(denominator > 0, "threshold denominator must be non-zero");
        assert!(numerator <= denominator, "threshold cannot exceed 1");
        Self {
            numerator,
            denominator,
        }
    }

    /// `accept / total >= numerator / denominator`, in integer arithmetic.
    pub fn met_by(&self, accept_weight: u64, total_weight: u64) -> bool {
        if total_weight == 0 {
            return false;
        }
        u128::from(accept_weight) * u128::from(self.denominator)
            >= u128::from(total_weight) * u128::from(self.numerator)
    }

    /// `reject / total > 1 - numerator / denominator`: once true, no
    /// combination of outstanding votes can still reach the threshold.
    pub fn unreachable_by(&self, reject_weight: u64, total_weight: u64) -> bool {
        if total_weight == 0 {
            return false;
        }
        u128::from(reject_weight) * u128::from(self.denominator)
            > u128::from(total_weight) * u128::from(self.denominator - self.numerator)
    }

    /// The threshold as an `f64`, for reporting only.
    pub fn as_fraction(&self) -> f64 {
        f64::from(self.numerator) / f64::from(self.denominator)
    }
}

/// Per-voter weights resolved from the registry or a test override map.
///
/// The total is the weight of *all* eligible sequencers, not just those who
/// voted: silence is implicitly a non-accept.
#[derive(Debug, Clone, Default)]
pub struct SequencerWeights {
    weights: HashMap<Address, u64>,
    total: u64,
    /// Number of eligible sequencers (denominator for the unweighted
    /// fallback when total weight is zero).
    eligible_count: u32,
}

impl SequencerWeights {
    pub fn new(weights: HashMap<Address, u64>) -> Self {
        let total = weights.values().sum();
        let eligible_count = weights.len() as u32;
        Self {
            weights,
            total,
            eligible_count,
        }
    }

    /// Weight of a voter; unknown voters weigh zero.
    pub fn weight_of(&self, address: &Address) -> u64 {
        self.weights.get(address).copied().unwrap_or(0)
    }

    pub fn total_weight(&self) -> u64 {
        self.total
    }

    pub fn eligible_count(&self) -> u32 {
        self.eligible_count
    }
}

/// Result of weighted vote aggregation for one block hash.
///
/// Derived, recomputed on demand from the current vote set; never
/// persisted independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedConsensusResult {
    /// Block hash that was tallied.
    pub block_hash: Hash,
    /// Number of ACCEPT votes (unweighted count).
    pub accept_votes: u32,
    /// Number of REJECT votes.
    pub reject_votes: u32,
    /// Number of ABSTAIN votes.
    pub abstain_votes: u32,
    /// Total number of voters seen for this block.
    pub total_voters: u32,
    /// Weighted accept fraction over total eligible weight (0.0 - 1.0).
    pub weighted_accept_fraction: f64,
    /// Weighted reject fraction over total eligible weight (0.0 - 1.0).
    pub weighted_reject_fraction: f64,
    /// Whether the accept fraction meets the threshold.
    pub consensus_reached: bool,
    /// True when total eligible weight was zero and the tally fell back to
    /// the unweighted vote-count ratio. Degraded mode; callers should flag it.
    pub degraded: bool,
    /// Unix timestamp when the tally was computed.
    pub timestamp: u64,
}

impl WeightedConsensusResult {
    /// An empty tally for a block with no votes.
    pub fn empty(block_hash: Hash, timestamp: u64) -> Self {
        Self {
            block_hash,
            accept_votes: 0,
            reject_votes: 0,
            abstain_votes: 0,
            total_voters: 0,
            weighted_accept_fraction: 0.0,
            weighted_reject_fraction: 0.0,
            consensus_reached: false,
            degraded: false,
            timestamp,
        }
    }
}

/// Tally every recorded vote for `block_hash` against the eligible weights.
///
/// An unknown voter's weight is zero: the vote still counts toward
/// `total_voters` but moves none of the weighted fractions. When the
/// registry reports zero total weight, the tally falls back to the
/// unweighted vote-count ratio over the eligible-voter count so a
/// registry outage cannot deadlock the round; the result is marked
/// `degraded`.
pub fn tally_votes<'a, I>(
    block_hash: Hash,
    votes: I,
    weights: &SequencerWeights,
    threshold: ConsensusThreshold,
    now: u64,
) -> WeightedConsensusResult
where
    I: IntoIterator<Item = &'a Vote>,
{
    let mut result = WeightedConsensusResult::empty(block_hash, now);

    let mut accept_weight: u64 = 0;
    let mut reject_weight: u64 = 0;

    for vote in votes {
        if vote.block_hash != block_hash {
            continue;
        }
        let weight = weights.weight_of(&vote.voter);
        result.total_voters += 1;

        match vote.value {
            crate::domain::VoteValue::Accept => {
                result.accept_votes += 1;
                accept_weight += weight;
            }
            crate::domain::VoteValue::Reject => {
                result.reject_votes += 1;
                reject_weight += weight;
            }
            crate::domain::VoteValue::Abstain => {
                result.abstain_votes += 1;
            }
        }
    }

    let total_weight = weights.total_weight();
    if total_weight > 0 {
        result.weighted_accept_fraction = accept_weight as f64 / total_weight as f64;
        result.weighted_reject_fraction = reject_weight as f64 / total_weight as f64;
        result.consensus_reached = threshold.met_by(accept_weight, total_weight);
    } else if weights.eligible_count() > 0 {
        // Degraded mode: unweighted ratio over the eligible set.
        result.degraded = true;
        let eligible = u64::from(weights.eligible_count());
        result.weighted_accept_fraction = f64::from(result.accept_votes) / eligible as f64;
        result.weighted_reject_fraction = f64::from(result.reject_votes) / eligible as f64;
        result.consensus_reached =
            threshold.met_by(u64::from(result.accept_votes), eligible);
    }

    result
}

/// Whether the recorded rejects make the threshold mathematically
/// unreachable for this block, in which case the round should fail
/// immediately instead of waiting out the timeout.
pub fn consensus_unreachable<'a, I>(
    block_hash: Hash,
    votes: I,
    weights: &SequencerWeights,
    threshold: ConsensusThreshold,
) -> bool
where
    I: IntoIterator<Item = &'a Vote>,
{
    let mut reject_weight: u64 = 0;
    let mut reject_votes: u64 = 0;
    for vote in votes {
        if vote.block_hash == block_hash && vote.is_reject() {
            reject_weight += weights.weight_of(&vote.voter);
            reject_votes += 1;
        }
    }

    let total_weight = weights.total_weight();
    if total_weight > 0 {
        threshold.unreachable_by(reject_weight, total_weight)
    } else if weights.eligible_count() > 0 {
        threshold.unreachable_by(reject_votes, u64::from(weights.eligible_count()))
    } else {
        false
    }
}
