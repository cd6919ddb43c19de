//! recon-db
//!
//! Ledger store: the two transaction tables, the capability traits the
//! matching engine consumes, and the Postgres implementation of them.
//! Also hosts schema provisioning (embedded migrations) and sample-data seeding.

use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

mod error;
mod model;
mod pg;
pub mod seed;
pub mod store;

pub use error::{BoxError, StoreError};
pub use model::{LedgerSide, Transaction};
pub use pg::PgLedger;
pub use recon_config::settings::{ENV_DB_NAME, ENV_DB_URL};
pub use sqlx::PgPool;
pub use store::{EligibleScan, LedgerStore, PairedUpdate, PointLookup};

/// Connect to the configured endpoint, selecting `cfg.name` as the database.
pub async fn connect(cfg: &recon_config::DatabaseConfig) -> Result<PgPool> {
    let opts = PgConnectOptions::from_str(&cfg.url)
        .with_context(|| format!("invalid database url: {}", cfg.redacted_url()))?
        .database(&cfg.name);

    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .connect_with(opts)
        .await
        .with_context(|| {
            format!(
                "failed to connect to Postgres at {} (database {})",
                cfg.redacted_url(),
                cfg.name
            )
        })?;

    Ok(pool)
}

/// Run embedded SQLx migrations: both ledger tables, their `txn_id`
/// uniqueness constraints and the eligibility-scan indexes.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_ledger_tables: bool,
    /// Unreconciled record count per side; `None` until migrated.
    pub unreconciled_incoming: Option<i64>,
    pub unreconciled_outgoing: Option<i64>,
}

/// Connectivity, schema presence and backlog size.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (n_tables,): (i64,) = sqlx::query_as::<_, (i64,)>(
        r#"
        select count(*)::bigint
        from information_schema.tables
        where table_schema = current_schema()
          and table_name in ('incoming_transactions', 'outgoing_transactions')
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    let has_ledger_tables = n_tables == 2;
    let (unreconciled_incoming, unreconciled_outgoing) = if has_ledger_tables {
        (
            Some(count_unreconciled(pool, LedgerSide::Incoming).await?),
            Some(count_unreconciled(pool, LedgerSide::Outgoing).await?),
        )
    } else {
        (None, None)
    };

    Ok(DbStatus {
        ok: one == 1,
        has_ledger_tables,
        unreconciled_incoming,
        unreconciled_outgoing,
    })
}

pub async fn count_unreconciled(pool: &PgPool, side: LedgerSide) -> Result<i64> {
    let sql = format!(
        "select count(*)::bigint from {} where reconciled = false",
        side.table_name()
    );
    let (n,): (i64,) = sqlx::query_as::<_, (i64,)>(&sql)
        .fetch_one(pool)
        .await
        .with_context(|| format!("count_unreconciled({side}) failed"))?;
    Ok(n)
}

/// Insert one record. Returns `false` when `txn_id` already exists on that side.
pub async fn insert_transaction(pool: &PgPool, side: LedgerSide, txn: &Transaction) -> Result<bool> {
    let sql = format!(
        r#"
        insert into {} (txn_id, amount, currency, ts_utc, source, reconciled)
        values ($1, $2, $3, $4, $5, $6)
        on conflict (txn_id) do nothing
        "#,
        side.table_name()
    );
    let res = sqlx::query(&sql)
        .bind(&txn.txn_id)
        .bind(txn.amount)
        .bind(&txn.currency)
        .bind(txn.timestamp)
        .bind(&txn.source)
        .bind(txn.reconciled)
        .execute(pool)
        .await
        .with_context(|| format!("insert_transaction({side}, {}) failed", txn.txn_id))?;

    Ok(res.rows_affected() == 1)
}
