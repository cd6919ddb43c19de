//! Scenario: Counterpart Already Reconciled
//!
//! # Invariants under test
//!
//! 1. An eligible incoming record whose outgoing counterpart is already
//!    `reconciled = true` still matches and is committed.
//! 2. Re-marking the already reconciled outgoing side succeeds.
//! 3. After the pass both flags are true, so the pairing invariant is restored.

use chrono::{Duration, TimeZone, Utc};
use recon_db::{LedgerSide, PairedUpdate, Transaction};
use recon_testkit::{MemoryLedger, SampleHarness};
use tokio_util::sync::CancellationToken;

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn half_reconciled(id: &str) -> MemoryLedger {
    let ts = now() - Duration::hours(2);
    let ledger = MemoryLedger::new();
    ledger.insert(LedgerSide::Incoming, Transaction::new(id, 310.0, "USD", ts, "bank"));

    let mut outgoing = Transaction::new(id, 310.0, "USD", ts, "processor");
    outgoing.reconciled = true;
    ledger.insert(LedgerSide::Outgoing, outgoing);
    ledger
}

#[tokio::test]
async fn pass_flips_incoming_and_keeps_outgoing_reconciled() {
    let h = SampleHarness::from_ledger(half_reconciled("txn_200"), now());
    assert_eq!(h.ledger.diverging_pairs(), vec!["txn_200"]);

    let report = h.engine.reconcile_pass(&CancellationToken::new()).await.unwrap();

    assert_eq!(report.scanned, 1);
    assert_eq!(report.reconciled, vec!["txn_200"]);
    assert!(report.unmatched.is_empty());
    assert!(report.mismatched.is_empty());
    assert_eq!(h.ledger.flags("txn_200"), (Some(true), Some(true)));
    assert!(h.ledger.diverging_pairs().is_empty());
}

#[tokio::test]
async fn re_marking_a_reconciled_pair_is_accepted() {
    let ledger = half_reconciled("txn_201");

    ledger.mark_reconciled_pair("txn_201", "txn_201").await.unwrap();
    ledger.mark_reconciled_pair("txn_201", "txn_201").await.unwrap();

    assert_eq!(ledger.flags("txn_201"), (Some(true), Some(true)));
}
