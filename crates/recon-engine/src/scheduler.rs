//! Periodic driver for [`ReconcileEngine::reconcile_pass`].
//!
//! - One pass per tick, awaited to completion before the next tick is
//!   considered, so passes never overlap.
//! - The first pass fires one full interval after start.
//! - Cancellation between passes stops the loop cleanly. Cancellation during a
//!   pass aborts the pass (it returns `Cancelled`) and then stops the loop.
//! - Any other pass failure is handled per [`PassErrorPolicy`].

use std::time::Duration;

use recon_config::{PassErrorPolicy, SchedulerConfig};
use recon_db::LedgerStore;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{ReconcileEngine, ReconcileError};

/// How the loop ended, when it ended without a fatal error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulerSummary {
    pub passes_completed: u64,
    pub passes_failed: u64,
    pub records_reconciled: u64,
    /// Cancellation arrived while a pass was in flight.
    pub interrupted_pass: bool,
}

pub struct Scheduler<S: ?Sized> {
    engine: ReconcileEngine<S>,
    interval: Duration,
    on_pass_error: PassErrorPolicy,
}

impl<S> Scheduler<S>
where
    S: LedgerStore + ?Sized,
{
    pub fn new(engine: ReconcileEngine<S>, cfg: &SchedulerConfig) -> Self {
        Self {
            engine,
            interval: cfg.interval(),
            on_pass_error: cfg.on_pass_error,
        }
    }

    /// Run until `cancel` fires (Ok) or a pass fails under [`PassErrorPolicy::Halt`] (Err).
    pub async fn run(&self, cancel: CancellationToken) -> Result<SchedulerSummary, ReconcileError> {
        let start = Instant::now()
            .checked_add(self.interval)
            .filter(|_| !self.interval.is_zero())
            .ok_or(ReconcileError::IntervalOutOfRange {
                interval_secs: self.interval.as_secs(),
            })?;
        let mut ticker = interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut summary = SchedulerSummary::default();
        info!(interval_secs = self.interval.as_secs(), "reconcile scheduler started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(passes = summary.passes_completed, "cancellation requested; scheduler stopped");
                    return Ok(summary);
                }
                _ = ticker.tick() => {}
            }

            match self.engine.reconcile_pass(&cancel).await {
                Ok(report) => {
                    summary.passes_completed += 1;
                    summary.records_reconciled += report.reconciled.len() as u64;
                }
                Err(e) if e.is_cancelled() => {
                    warn!(error = %e, "pass interrupted by cancellation; scheduler stopped");
                    summary.interrupted_pass = true;
                    return Ok(summary);
                }
                Err(e) => match self.on_pass_error {
                    PassErrorPolicy::Halt => {
                        error!(error = ?e, "reconcile pass failed; halting scheduler");
                        return Err(e);
                    }
                    PassErrorPolicy::Continue => {
                        summary.passes_failed += 1;
                        error!(error = ?e, "reconcile pass failed; retrying next tick");
                    }
                },
            }
        }
    }
}
