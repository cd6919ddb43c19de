use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use recon_db::{LedgerSide, LedgerStore, Transaction};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::{MatchOutcome, MismatchedPair, PairDiff, PassReport, ReconcileError};

fn compare_pair(incoming: &Transaction, outgoing: &Transaction, diffs: &mut Vec<PairDiff>) {
    // Amount: exact equality. Both sides record the same transfer value.
    if incoming.amount != outgoing.amount {
        diffs.push(PairDiff {
            field: "amount".to_string(),
            incoming: incoming.amount.to_string(),
            outgoing: outgoing.amount.to_string(),
        });
    }

    // Currency
    if incoming.currency != outgoing.currency {
        diffs.push(PairDiff {
            field: "currency".to_string(),
            incoming: incoming.currency.clone(),
            outgoing: outgoing.currency.clone(),
        });
    }
}

/// Pure verdict for one incoming record and its (possible) counterpart.
///
/// The counterpart's own `reconciled` flag is not consulted: re-marking an
/// already reconciled record is idempotent.
pub fn classify(incoming: &Transaction, outgoing: Option<&Transaction>) -> MatchOutcome {
    let Some(outgoing) = outgoing else {
        return MatchOutcome::Unmatched;
    };

    let mut diffs = Vec::new();
    compare_pair(incoming, outgoing, &mut diffs);

    if diffs.is_empty() {
        MatchOutcome::Matched
    } else {
        diffs.sort();
        MatchOutcome::Mismatch { diffs }
    }
}

/// Run `fut` unless `cancel` fires first. Dropping `fut` releases whatever it
/// holds (a dropped paired update rolls its transaction back).
async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    processed: usize,
    fut: F,
) -> Result<F::Output, ReconcileError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ReconcileError::Cancelled { processed }),
        out = fut => Ok(out),
    }
}

/// The matching engine.
///
/// One operation: [`ReconcileEngine::reconcile_pass`]. Passes are meant to be
/// driven sequentially (see [`crate::Scheduler`]); the engine holds no
/// per-pass state of its own.
pub struct ReconcileEngine<S: ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    staleness: Duration,
}

impl<S: ?Sized> Clone for ReconcileEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            staleness: self.staleness,
        }
    }
}

impl<S> ReconcileEngine<S>
where
    S: LedgerStore + ?Sized,
{
    pub fn new(store: Arc<S>, cfg: &recon_config::EngineConfig) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            staleness: cfg.staleness(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Records timestamped strictly before this instant are eligible.
    pub fn eligibility_cutoff(&self) -> DateTime<Utc> {
        let now = self.clock.now();
        chrono::Duration::from_std(self.staleness)
            .ok()
            .and_then(|d| now.checked_sub_signed(d))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// One reconciliation pass over the incoming ledger.
    ///
    /// - Unmatched and mismatched records are logged, reported and skipped.
    /// - The first store failure aborts the pass; remaining eligible records
    ///   are left untouched for the next pass.
    /// - `cancel` is observed at every store call; a cancelled pass returns
    ///   [`ReconcileError::Cancelled`].
    pub async fn reconcile_pass(
        &self,
        cancel: &CancellationToken,
    ) -> Result<PassReport, ReconcileError> {
        let pass_id = Uuid::new_v4();
        let span = info_span!("reconcile_pass", %pass_id);
        self.run_pass(pass_id, cancel).instrument(span).await
    }

    async fn run_pass(
        &self,
        pass_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<PassReport, ReconcileError> {
        let cutoff = self.eligibility_cutoff();
        let mut report = PassReport::new(pass_id, cutoff);

        let eligible = until_cancelled(
            cancel,
            0,
            self.store.find_eligible(LedgerSide::Incoming, cutoff),
        )
        .await?
        .map_err(|source| ReconcileError::Scan {
            side: LedgerSide::Incoming,
            source,
        })?;

        report.scanned = eligible.len();
        info!(eligible = eligible.len(), %cutoff, "reconcile pass started");

        for incoming in eligible {
            let processed = report.processed();
            let txn_id = incoming.txn_id.as_str();

            let counterpart = until_cancelled(
                cancel,
                processed,
                self.store.find_by_id(LedgerSide::Outgoing, txn_id),
            )
            .await?
            .map_err(|source| ReconcileError::Lookup {
                txn_id: txn_id.to_string(),
                source,
            })?;

            match classify(&incoming, counterpart.as_ref()) {
                MatchOutcome::Unmatched => {
                    info!(txn_id, "no outgoing counterpart yet; skipping");
                    report.unmatched.push(incoming.txn_id.clone());
                }
                MatchOutcome::Mismatch { diffs } => {
                    warn!(
                        txn_id,
                        diffs = ?diffs,
                        "amount or currency mismatch; skipping"
                    );
                    report.mismatched.push(MismatchedPair {
                        txn_id: incoming.txn_id.clone(),
                        diffs,
                    });
                }
                MatchOutcome::Matched => {
                    until_cancelled(
                        cancel,
                        processed,
                        self.store.mark_reconciled_pair(txn_id, txn_id),
                    )
                    .await?
                    .map_err(|source| ReconcileError::Commit {
                        txn_id: txn_id.to_string(),
                        reconciled_before: report.reconciled.len(),
                        source,
                    })?;

                    info!(txn_id, amount = incoming.amount, currency = %incoming.currency, "pair reconciled");
                    report.reconciled.push(incoming.txn_id.clone());
                }
            }
        }

        info!(
            scanned = report.scanned,
            reconciled = report.reconciled.len(),
            unmatched = report.unmatched.len(),
            mismatched = report.mismatched.len(),
            "reconcile pass finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn txn(id: &str, amount: f64, currency: &str) -> Transaction {
        let ts = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        Transaction::new(id, amount, currency, ts, "unit")
    }

    #[test]
    fn missing_counterpart_is_unmatched() {
        assert_eq!(classify(&txn("a", 1.0, "USD"), None), MatchOutcome::Unmatched);
    }

    #[test]
    fn equal_amount_and_currency_match() {
        let i = txn("a", 100.0, "USD");
        let o = txn("a", 100.0, "USD");
        assert!(classify(&i, Some(&o)).is_matched());
    }

    #[test]
    fn already_reconciled_counterpart_still_matches() {
        let i = txn("a", 100.0, "USD");
        let mut o = txn("a", 100.0, "USD");
        o.reconciled = true;
        assert!(classify(&i, Some(&o)).is_matched());
    }

    #[test]
    fn amount_and_currency_diffs_are_both_reported() {
        let i = txn("a", 100.0, "USD");
        let o = txn("a", 99.5, "EUR");

        let MatchOutcome::Mismatch { diffs } = classify(&i, Some(&o)) else {
            panic!("expected mismatch");
        };
        let fields: Vec<&str> = diffs.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, vec!["amount", "currency"]);
        assert_eq!(diffs[0].incoming, "100");
        assert_eq!(diffs[0].outgoing, "99.5");
    }

    #[test]
    fn source_and_timestamp_do_not_affect_verdict() {
        let i = txn("a", 5.0, "USD");
        let mut o = txn("a", 5.0, "USD");
        o.source = "other-system".to_string();
        o.timestamp = o.timestamp + chrono::Duration::hours(3);
        assert!(classify(&i, Some(&o)).is_matched());
    }
}
