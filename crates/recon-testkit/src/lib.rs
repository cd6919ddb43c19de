//! Test support for the reconciler: an in-memory ledger store with fault
//! injection, a manual clock, and fixture loading. No DB required.

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use recon_config::EngineConfig;
use recon_db::seed::{sample_ledger, SampleLedger};
use recon_engine::ReconcileEngine;

mod clock;
mod memory_ledger;

pub use clock::ManualClock;
pub use memory_ledger::{CallStats, MemoryLedger};

pub fn load_ledger_fixture_json(path: &str) -> Result<SampleLedger> {
    let s = fs::read_to_string(path).with_context(|| format!("read ledger fixture: {path}"))?;
    let ledger: SampleLedger = serde_json::from_str(&s).context("parse ledger fixture json")?;
    Ok(ledger)
}

/// The sample ledger (txn_001..txn_004) seeded into memory, plus an engine over
/// it whose clock is pinned at `now`.
pub struct SampleHarness {
    pub ledger: Arc<MemoryLedger>,
    pub clock: Arc<ManualClock>,
    pub engine: ReconcileEngine<MemoryLedger>,
}

impl SampleHarness {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::from_ledger(MemoryLedger::from_sample(&sample_ledger(now)), now)
    }

    pub fn from_ledger(ledger: MemoryLedger, now: DateTime<Utc>) -> Self {
        let ledger = Arc::new(ledger);
        let clock = Arc::new(ManualClock::new(now));
        let engine = ReconcileEngine::new(Arc::clone(&ledger), &EngineConfig::default())
            .with_clock(clock.clone());
        Self {
            ledger,
            clock,
            engine,
        }
    }
}
