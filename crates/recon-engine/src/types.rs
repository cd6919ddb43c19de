use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Field-level disagreement between the two sides of a pair.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairDiff {
    pub field: String,
    pub incoming: String,
    pub outgoing: String,
}

/// Verdict for one eligible incoming record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Counterpart exists and amount + currency agree: commit the pair.
    Matched,
    /// No outgoing record with the same `txn_id` yet.
    Unmatched,
    /// Counterpart exists but disagrees. Never an error; nothing is written.
    Mismatch { diffs: Vec<PairDiff> },
}

impl MatchOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, MatchOutcome::Matched)
    }
}

/// A skipped pair with its evidence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MismatchedPair {
    pub txn_id: String,
    pub diffs: Vec<PairDiff>,
}

/// What one pass observed and did.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PassReport {
    pub pass_id: Uuid,
    /// Records with a timestamp before this instant were eligible.
    pub cutoff: DateTime<Utc>,
    pub scanned: usize,
    pub reconciled: Vec<String>,
    pub unmatched: Vec<String>,
    pub mismatched: Vec<MismatchedPair>,
}

impl PassReport {
    pub fn new(pass_id: Uuid, cutoff: DateTime<Utc>) -> Self {
        Self {
            pass_id,
            cutoff,
            scanned: 0,
            reconciled: Vec::new(),
            unmatched: Vec::new(),
            mismatched: Vec::new(),
        }
    }

    /// Records evaluated so far (any verdict).
    pub fn processed(&self) -> usize {
        self.reconciled.len() + self.unmatched.len() + self.mismatched.len()
    }

    /// True when the pass changed nothing.
    ///
    /// Only commits write, so an empty `reconciled` list is sufficient; the
    /// pass may still have reported unmatched or mismatched records.
    pub fn is_noop(&self) -> bool {
        self.reconciled.is_empty()
    }
}
