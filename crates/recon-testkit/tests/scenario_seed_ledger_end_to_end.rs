//! Scenario: Sample Ledger Reconciles End To End
//!
//! # Invariants under test
//!
//! 1. One pass over the sample ledger reconciles txn_001 and txn_003 on both sides.
//! 2. txn_002 (incoming only) is reported unmatched and left unreconciled.
//! 3. txn_004 (outgoing only) is never scanned and left unreconciled.
//! 4. A second pass changes nothing.
//!
//! All tests are pure in-process; no DB or network required.

use chrono::{TimeZone, Utc};
use recon_db::LedgerSide;
use recon_testkit::SampleHarness;
use tokio_util::sync::CancellationToken;

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

#[tokio::test]
async fn one_pass_reconciles_shared_ids_only() {
    let h = SampleHarness::new(now());

    let report = h.engine.reconcile_pass(&CancellationToken::new()).await.unwrap();

    assert_eq!(report.scanned, 3);
    assert_eq!(report.reconciled, vec!["txn_001", "txn_003"]);
    assert_eq!(report.unmatched, vec!["txn_002"]);
    assert!(report.mismatched.is_empty());

    assert_eq!(h.ledger.flags("txn_001"), (Some(true), Some(true)));
    assert_eq!(h.ledger.flags("txn_003"), (Some(true), Some(true)));
    assert_eq!(h.ledger.flags("txn_002"), (Some(false), None));
    assert_eq!(h.ledger.flags("txn_004"), (None, Some(false)));
}

#[tokio::test]
async fn second_pass_is_a_noop() {
    let h = SampleHarness::new(now());
    let cancel = CancellationToken::new();

    h.engine.reconcile_pass(&cancel).await.unwrap();
    let before_in = h.ledger.reconciled_ids(LedgerSide::Incoming);
    let before_out = h.ledger.reconciled_ids(LedgerSide::Outgoing);

    let second = h.engine.reconcile_pass(&cancel).await.unwrap();

    assert!(second.is_noop());
    assert_eq!(second.scanned, 1, "only txn_002 is still eligible");
    assert_eq!(second.unmatched, vec!["txn_002"]);
    assert_eq!(h.ledger.reconciled_ids(LedgerSide::Incoming), before_in);
    assert_eq!(h.ledger.reconciled_ids(LedgerSide::Outgoing), before_out);
}

#[tokio::test]
async fn pairing_invariant_holds_after_every_pass() {
    let h = SampleHarness::new(now());
    let cancel = CancellationToken::new();

    for _ in 0..3 {
        h.engine.reconcile_pass(&cancel).await.unwrap();
        assert!(h.ledger.diverging_pairs().is_empty());
    }
}

#[tokio::test]
async fn late_counterpart_is_picked_up_next_pass() {
    let h = SampleHarness::new(now());
    let cancel = CancellationToken::new();

    h.engine.reconcile_pass(&cancel).await.unwrap();
    assert_eq!(h.ledger.flags("txn_002"), (Some(false), None));

    let incoming = h.ledger.get(LedgerSide::Incoming, "txn_002").unwrap();
    h.ledger.insert(LedgerSide::Outgoing, incoming);

    let report = h.engine.reconcile_pass(&cancel).await.unwrap();
    assert_eq!(report.reconciled, vec!["txn_002"]);
    assert_eq!(h.ledger.flags("txn_002"), (Some(true), Some(true)));
}
