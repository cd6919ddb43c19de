use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the two ledgers participating in reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerSide {
    Incoming,
    Outgoing,
}

impl LedgerSide {
    pub const ALL: [LedgerSide; 2] = [LedgerSide::Incoming, LedgerSide::Outgoing];

    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerSide::Incoming => "incoming",
            LedgerSide::Outgoing => "outgoing",
        }
    }

    /// Backing table. Table names cannot be bound as parameters, so they come
    /// from this closed set only.
    pub fn table_name(&self) -> &'static str {
        match self {
            LedgerSide::Incoming => "incoming_transactions",
            LedgerSide::Outgoing => "outgoing_transactions",
        }
    }
}

impl std::fmt::Display for LedgerSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ledger record as stored on either side.
///
/// `txn_id` joins the two sides. The engine only ever flips `reconciled`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub txn_id: String,
    pub amount: f64,
    #[serde(default)]
    pub currency: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub reconciled: bool,
}

impl Transaction {
    /// A fresh, unreconciled record.
    pub fn new(
        txn_id: impl Into<String>,
        amount: f64,
        currency: impl Into<String>,
        timestamp: DateTime<Utc>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            txn_id: txn_id.into(),
            amount,
            currency: currency.into(),
            timestamp,
            source: source.into(),
            reconciled: false,
        }
    }

    /// True once the record is strictly older than `older_than`.
    pub fn is_older_than(&self, older_than: DateTime<Utc>) -> bool {
        self.timestamp < older_than
    }
}
