//! In-memory ledger store used ONLY for tests.
//!
//! Implements every capability the engine consumes, with the same contract as
//! the Postgres store: the paired update stages both flips and only publishes
//! them if both records exist and no fault fires.
//!
//! Faults are keyed by `txn_id` so a test can break exactly one record of a
//! pass and observe what happens to the others.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use recon_db::seed::SampleLedger;
use recon_db::{EligibleScan, LedgerSide, PairedUpdate, PointLookup, StoreError, Transaction};

#[derive(Debug, Default, Clone)]
struct Faults {
    fail_scan: bool,
    fail_lookup: BTreeSet<String>,
    fail_commit: BTreeSet<String>,
    /// Commit applies the first flip to a staged copy, then fails before publishing.
    interrupt_commit: BTreeSet<String>,
    stall_lookup: BTreeSet<String>,
    stall_commit: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct Inner {
    incoming: BTreeMap<String, Transaction>,
    outgoing: BTreeMap<String, Transaction>,
    faults: Faults,
}

impl Inner {
    fn side(&self, side: LedgerSide) -> &BTreeMap<String, Transaction> {
        match side {
            LedgerSide::Incoming => &self.incoming,
            LedgerSide::Outgoing => &self.outgoing,
        }
    }

    fn side_mut(&mut self, side: LedgerSide) -> &mut BTreeMap<String, Transaction> {
        match side {
            LedgerSide::Incoming => &mut self.incoming,
            LedgerSide::Outgoing => &mut self.outgoing,
        }
    }
}

/// Call counters, readable while the ledger is in use.
#[derive(Debug, Default)]
pub struct CallStats {
    pub scans: AtomicUsize,
    pub lookups: AtomicUsize,
    pub commits: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a CallStats);

impl<'a> InFlight<'a> {
    fn enter(stats: &'a CallStats) -> Self {
        let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        stats.max_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight(stats)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct InjectedFault(&'static str);

impl std::fmt::Display for InjectedFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "injected fault: {}", self.0)
    }
}

impl std::error::Error for InjectedFault {}

#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: Mutex<Inner>,
    pub stats: CallStats,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sample(sample: &SampleLedger) -> Self {
        let ledger = Self::new();
        for side in LedgerSide::ALL {
            for txn in sample.records(side) {
                ledger.insert(side, txn.clone());
            }
        }
        ledger
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Insert or replace a record.
    pub fn insert(&self, side: LedgerSide, txn: Transaction) {
        self.lock().side_mut(side).insert(txn.txn_id.clone(), txn);
    }

    pub fn get(&self, side: LedgerSide, txn_id: &str) -> Option<Transaction> {
        self.lock().side(side).get(txn_id).cloned()
    }

    /// `(incoming.reconciled, outgoing.reconciled)`; `None` where the record is absent.
    pub fn flags(&self, txn_id: &str) -> (Option<bool>, Option<bool>) {
        let inner = self.lock();
        (
            inner.incoming.get(txn_id).map(|t| t.reconciled),
            inner.outgoing.get(txn_id).map(|t| t.reconciled),
        )
    }

    /// Sorted ids with `reconciled = true` on `side`.
    pub fn reconciled_ids(&self, side: LedgerSide) -> Vec<String> {
        self.lock()
            .side(side)
            .values()
            .filter(|t| t.reconciled)
            .map(|t| t.txn_id.clone())
            .collect()
    }

    /// Ids present on both sides whose flags disagree. Empty when the pairing invariant holds.
    pub fn diverging_pairs(&self) -> Vec<String> {
        let inner = self.lock();
        inner
            .incoming
            .values()
            .filter_map(|i| {
                let o = inner.outgoing.get(&i.txn_id)?;
                (i.reconciled != o.reconciled).then(|| i.txn_id.clone())
            })
            .collect()
    }

    pub fn fail_scan(&self, on: bool) {
        self.lock().faults.fail_scan = on;
    }

    pub fn fail_lookup_for(&self, txn_id: &str) {
        self.lock().faults.fail_lookup.insert(txn_id.to_string());
    }

    pub fn fail_commit_for(&self, txn_id: &str) {
        self.lock().faults.fail_commit.insert(txn_id.to_string());
    }

    pub fn interrupt_commit_for(&self, txn_id: &str) {
        self.lock().faults.interrupt_commit.insert(txn_id.to_string());
    }

    /// The lookup for `txn_id` never completes (until its future is dropped).
    pub fn stall_lookup_for(&self, txn_id: &str) {
        self.lock().faults.stall_lookup.insert(txn_id.to_string());
    }

    /// The paired update for `txn_id` never completes and never publishes.
    pub fn stall_commit_for(&self, txn_id: &str) {
        self.lock().faults.stall_commit.insert(txn_id.to_string());
    }

    pub fn clear_faults(&self) {
        self.lock().faults = Faults::default();
    }
}

#[async_trait]
impl EligibleScan for MemoryLedger {
    async fn find_eligible(
        &self,
        side: LedgerSide,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, StoreError> {
        let _g = InFlight::enter(&self.stats);
        self.stats.scans.fetch_add(1, Ordering::SeqCst);

        let inner = self.lock();
        if inner.faults.fail_scan {
            return Err(StoreError::query("find_eligible", side, InjectedFault("scan")));
        }
        Ok(inner
            .side(side)
            .values()
            .filter(|t| !t.reconciled && t.is_older_than(older_than))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PointLookup for MemoryLedger {
    async fn find_by_id(
        &self,
        side: LedgerSide,
        txn_id: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        let _g = InFlight::enter(&self.stats);
        self.stats.lookups.fetch_add(1, Ordering::SeqCst);

        let stall = {
            let inner = self.lock();
            if inner.faults.fail_lookup.contains(txn_id) {
                return Err(StoreError::query("find_by_id", side, InjectedFault("lookup")));
            }
            inner.faults.stall_lookup.contains(txn_id)
        };
        if stall {
            std::future::pending::<()>().await;
        }

        Ok(self.get(side, txn_id))
    }
}

#[async_trait]
impl PairedUpdate for MemoryLedger {
    async fn mark_reconciled_pair(
        &self,
        incoming_txn_id: &str,
        outgoing_txn_id: &str,
    ) -> Result<(), StoreError> {
        let _g = InFlight::enter(&self.stats);
        self.stats.commits.fetch_add(1, Ordering::SeqCst);

        let fail = |reason: &str| {
            StoreError::transaction_failed(incoming_txn_id, outgoing_txn_id, reason, None)
        };

        let stall = self.lock().faults.stall_commit.contains(incoming_txn_id);
        if stall {
            std::future::pending::<()>().await;
        }

        let mut inner = self.lock();
        if inner.faults.fail_commit.contains(incoming_txn_id) {
            return Err(fail("injected commit failure"));
        }

        // Stage both flips on copies; publish only if the whole pair succeeds.
        let mut staged_in = inner
            .incoming
            .get(incoming_txn_id)
            .cloned()
            .ok_or_else(|| fail("no incoming record to update; rolled back"))?;
        staged_in.reconciled = true;

        if inner.faults.interrupt_commit.contains(incoming_txn_id) {
            return Err(fail("interrupted before commit"));
        }

        let mut staged_out = inner
            .outgoing
            .get(outgoing_txn_id)
            .cloned()
            .ok_or_else(|| fail("no outgoing record to update; rolled back"))?;
        staged_out.reconciled = true;

        inner.incoming.insert(staged_in.txn_id.clone(), staged_in);
        inner.outgoing.insert(staged_out.txn_id.clone(), staged_out);
        Ok(())
    }
}
