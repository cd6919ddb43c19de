//! Sample data for local runs and end-to-end checks.
//!
//! incoming: txn_001 (100), txn_002 (250), txn_003 (500)
//! outgoing: txn_001 (100), txn_003 (500), txn_004 (300)
//!
//! Every record is stamped 24h before `now`, well past the staleness window.
//! One pass should reconcile txn_001 and txn_003 and leave txn_002/txn_004 alone.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

use crate::{insert_transaction, LedgerSide, Transaction};

pub const SEED_SOURCE: &str = "seed";
pub const SEED_CURRENCY: &str = "USD";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SampleLedger {
    #[serde(default)]
    pub incoming: Vec<Transaction>,
    #[serde(default)]
    pub outgoing: Vec<Transaction>,
}

impl SampleLedger {
    pub fn records(&self, side: LedgerSide) -> &[Transaction] {
        match side {
            LedgerSide::Incoming => &self.incoming,
            LedgerSide::Outgoing => &self.outgoing,
        }
    }
}

pub fn sample_ledger(now: DateTime<Utc>) -> SampleLedger {
    let ts = now - Duration::hours(24);
    let rec = |id: &str, amount: f64| Transaction::new(id, amount, SEED_CURRENCY, ts, SEED_SOURCE);

    SampleLedger {
        incoming: vec![rec("txn_001", 100.0), rec("txn_002", 250.0), rec("txn_003", 500.0)],
        outgoing: vec![rec("txn_001", 100.0), rec("txn_003", 500.0), rec("txn_004", 300.0)],
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub incoming_inserted: usize,
    pub outgoing_inserted: usize,
}

/// Insert the sample ledger. Already-present ids are left untouched, so
/// re-running seed is harmless.
pub async fn seed_sample_data(pool: &PgPool, now: DateTime<Utc>) -> Result<SeedReport> {
    let sample = sample_ledger(now);
    let mut report = SeedReport::default();

    for side in LedgerSide::ALL {
        for txn in sample.records(side) {
            if insert_transaction(pool, side, txn).await? {
                match side {
                    LedgerSide::Incoming => report.incoming_inserted += 1,
                    LedgerSide::Outgoing => report.outgoing_inserted += 1,
                }
            }
        }
    }

    info!(
        incoming_inserted = report.incoming_inserted,
        outgoing_inserted = report.outgoing_inserted,
        "sample ledger seeded"
    );
    Ok(report)
}
