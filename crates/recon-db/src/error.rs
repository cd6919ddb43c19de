use crate::LedgerSide;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures surfaced by a ledger store to the engine.
///
/// "Record not found" is not an error: point lookups return `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A read (eligibility scan or point lookup) could not complete:
    /// store unavailable, decode failure, ...
    #[error("{op} on {side} ledger failed")]
    Query {
        op: &'static str,
        side: LedgerSide,
        #[source]
        source: BoxError,
    },

    /// The paired update did not commit. Neither side was changed.
    #[error(
        "transaction failed for pair incoming={incoming_txn_id} outgoing={outgoing_txn_id}: {reason}"
    )]
    TransactionFailed {
        incoming_txn_id: String,
        outgoing_txn_id: String,
        reason: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl StoreError {
    pub fn query(op: &'static str, side: LedgerSide, source: impl Into<BoxError>) -> Self {
        StoreError::Query {
            op,
            side,
            source: source.into(),
        }
    }

    pub fn transaction_failed(
        incoming_txn_id: &str,
        outgoing_txn_id: &str,
        reason: impl Into<String>,
        source: Option<BoxError>,
    ) -> Self {
        StoreError::TransactionFailed {
            incoming_txn_id: incoming_txn_id.to_string(),
            outgoing_txn_id: outgoing_txn_id.to_string(),
            reason: reason.into(),
            source,
        }
    }

    pub fn is_transaction_failed(&self) -> bool {
        matches!(self, StoreError::TransactionFailed { .. })
    }
}
