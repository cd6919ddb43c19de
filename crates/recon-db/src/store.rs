//! Ledger store capabilities consumed by the matching engine.
//!
//! The engine never sees a connection, pool or session. It asks for three
//! things, each a separate capability so a backend (or a test double) can be
//! reasoned about one contract at a time:
//!
//! 1. [`EligibleScan`]: unreconciled records on a side older than a cutoff
//! 2. [`PointLookup`]: one record on a side by `txn_id`
//! 3. [`PairedUpdate`]: flip `reconciled` on both sides, all-or-nothing
//!
//! Any backend with multi-record ACID transactions can implement
//! [`PairedUpdate`]. The transactional session is owned by the implementation
//! and must be released on every exit path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{LedgerSide, StoreError, Transaction};

#[async_trait]
pub trait EligibleScan: Send + Sync {
    /// Records on `side` with `reconciled = false` and `timestamp < older_than`.
    /// Order is unspecified.
    async fn find_eligible(
        &self,
        side: LedgerSide,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, StoreError>;
}

#[async_trait]
pub trait PointLookup: Send + Sync {
    /// `Ok(None)` when no record with `txn_id` exists on `side`.
    async fn find_by_id(
        &self,
        side: LedgerSide,
        txn_id: &str,
    ) -> Result<Option<Transaction>, StoreError>;
}

#[async_trait]
pub trait PairedUpdate: Send + Sync {
    /// Set `reconciled = true` on the incoming record `incoming_txn_id` and the
    /// outgoing record `outgoing_txn_id` in one atomic operation.
    ///
    /// # Contract
    /// - Both updates become visible together or not at all.
    /// - Setting an already-true flag is allowed (idempotent).
    /// - If either record is missing, nothing is changed and
    ///   [`StoreError::TransactionFailed`] is returned.
    /// - Transient conflicts may be retried internally; the caller never retries.
    async fn mark_reconciled_pair(
        &self,
        incoming_txn_id: &str,
        outgoing_txn_id: &str,
    ) -> Result<(), StoreError>;
}

/// Everything the matching engine needs from a ledger backend.
pub trait LedgerStore: EligibleScan + PointLookup + PairedUpdate {}

impl<T> LedgerStore for T where T: EligibleScan + PointLookup + PairedUpdate + ?Sized {}
