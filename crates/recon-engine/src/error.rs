use recon_db::{LedgerSide, StoreError};

/// Why a reconcile pass (or the scheduler driving it) stopped early.
///
/// Unmatched and mismatched records are business outcomes and never appear
/// here. Every pass variant aborts the pass; records reconciled before the
/// abort stay reconciled, the rest are eligible again next pass.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("eligibility scan on {side} ledger failed")]
    Scan {
        side: LedgerSide,
        #[source]
        source: StoreError,
    },

    #[error("counterpart lookup failed for txn_id={txn_id}")]
    Lookup {
        txn_id: String,
        #[source]
        source: StoreError,
    },

    #[error("paired update failed for txn_id={txn_id} after {reconciled_before} reconciled in this pass")]
    Commit {
        txn_id: String,
        reconciled_before: usize,
        #[source]
        source: StoreError,
    },

    #[error("reconcile pass cancelled after {processed} record(s)")]
    Cancelled { processed: usize },

    /// The scheduler cannot place its first tick on the runtime clock.
    #[error("scheduler interval of {interval_secs}s is out of range")]
    IntervalOutOfRange { interval_secs: u64 },
}

impl ReconcileError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ReconcileError::Cancelled { .. })
    }
}
