//! recon-engine
//!
//! Matching engine for the incoming/outgoing transaction ledgers.
//!
//! Rules:
//! - Only incoming records older than the staleness window are scanned
//! - Missing outgoing counterpart => unmatched, skipped (not an error)
//! - Amount or currency disagreement => mismatch, skipped (not an error)
//! - Agreement => both sides marked reconciled in one atomic store operation
//! - Any store failure aborts the pass; nothing is retried record-by-record
//!
//! The verdict itself ([`classify`]) is pure. All IO goes through the
//! [`recon_db::LedgerStore`] capabilities.

mod clock;
mod engine;
mod error;
mod scheduler;
mod types;

pub use clock::{Clock, SystemClock};
pub use engine::{classify, ReconcileEngine};
pub use error::ReconcileError;
pub use scheduler::{Scheduler, SchedulerSummary};
pub use types::*;
