//! Postgres-backed ledger store.
//!
//! The paired update runs in a `SERIALIZABLE` transaction. A concurrent writer
//! on either row aborts with SQLSTATE 40001 instead of interleaving.
//!
//! The sqlx `Transaction` guard is the session. It is created per pair, used
//! for exactly the two updates, and either committed or rolled back (explicitly,
//! or on drop when the future is cancelled or an update errors).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, warn};

use crate::store::{EligibleScan, PairedUpdate, PointLookup};
use crate::{LedgerSide, StoreError, Transaction};

/// Postgres SQLSTATEs worth retrying: serialization_failure, deadlock_detected.
const TRANSIENT_SQLSTATES: &[&str] = &["40001", "40P01"];

#[derive(Debug, Clone)]
pub struct PgLedger {
    pool: PgPool,
    commit_retries: u32,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            commit_retries: 0,
        }
    }

    /// Extra attempts after a transient commit conflict.
    pub fn with_commit_retries(mut self, retries: u32) -> Self {
        self.commit_retries = retries;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn try_mark_pair(
        &self,
        incoming_txn_id: &str,
        outgoing_txn_id: &str,
    ) -> Result<(), PairAttemptError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("set transaction isolation level serializable")
            .execute(&mut *tx)
            .await?;

        for (side, txn_id) in [
            (LedgerSide::Incoming, incoming_txn_id),
            (LedgerSide::Outgoing, outgoing_txn_id),
        ] {
            let sql = format!(
                "update {} set reconciled = true where txn_id = $1",
                side.table_name()
            );
            let affected = sqlx::query(&sql)
                .bind(txn_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            if affected != 1 {
                tx.rollback().await?;
                return Err(PairAttemptError::MissingRow(side));
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug)]
enum PairAttemptError {
    MissingRow(LedgerSide),
    Db(sqlx::Error),
}

impl From<sqlx::Error> for PairAttemptError {
    fn from(e: sqlx::Error) -> Self {
        PairAttemptError::Db(e)
    }
}

fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .map(|c| TRANSIENT_SQLSTATES.contains(&&*c))
            .unwrap_or(false),
        _ => false,
    }
}

fn transaction_from_row(row: &PgRow) -> Result<Transaction, sqlx::Error> {
    Ok(Transaction {
        txn_id: row.try_get("txn_id")?,
        amount: row.try_get("amount")?,
        currency: row.try_get("currency")?,
        timestamp: row.try_get("ts_utc")?,
        source: row.try_get("source")?,
        reconciled: row.try_get("reconciled")?,
    })
}

#[async_trait]
impl EligibleScan for PgLedger {
    async fn find_eligible(
        &self,
        side: LedgerSide,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, StoreError> {
        let sql = format!(
            r#"
            select txn_id, amount, currency, ts_utc, source, reconciled
            from {}
            where reconciled = false
              and ts_utc < $1
            "#,
            side.table_name()
        );

        let rows = sqlx::query(&sql)
            .bind(older_than)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::query("find_eligible", side, e))?;

        rows.iter()
            .map(transaction_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::query("find_eligible decode", side, e))
    }
}

#[async_trait]
impl PointLookup for PgLedger {
    async fn find_by_id(
        &self,
        side: LedgerSide,
        txn_id: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        let sql = format!(
            r#"
            select txn_id, amount, currency, ts_utc, source, reconciled
            from {}
            where txn_id = $1
            "#,
            side.table_name()
        );

        let row = sqlx::query(&sql)
            .bind(txn_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::query("find_by_id", side, e))?;

        row.as_ref()
            .map(transaction_from_row)
            .transpose()
            .map_err(|e| StoreError::query("find_by_id decode", side, e))
    }
}

#[async_trait]
impl PairedUpdate for PgLedger {
    async fn mark_reconciled_pair(
        &self,
        incoming_txn_id: &str,
        outgoing_txn_id: &str,
    ) -> Result<(), StoreError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.try_mark_pair(incoming_txn_id, outgoing_txn_id).await {
                Ok(()) => {
                    debug!(incoming_txn_id, outgoing_txn_id, attempt, "pair committed");
                    return Ok(());
                }
                Err(PairAttemptError::Db(e)) if is_transient(&e) && attempt <= self.commit_retries => {
                    warn!(
                        incoming_txn_id,
                        outgoing_txn_id,
                        attempt,
                        error = %e,
                        "transient conflict on paired update, retrying"
                    );
                }
                Err(PairAttemptError::Db(e)) => {
                    return Err(StoreError::transaction_failed(
                        incoming_txn_id,
                        outgoing_txn_id,
                        format!("commit failed after {attempt} attempt(s)"),
                        Some(e.into()),
                    ));
                }
                Err(PairAttemptError::MissingRow(side)) => {
                    return Err(StoreError::transaction_failed(
                        incoming_txn_id,
                        outgoing_txn_id,
                        format!("no {side} record to update; rolled back"),
                        None,
                    ));
                }
            }
        }
    }
}
