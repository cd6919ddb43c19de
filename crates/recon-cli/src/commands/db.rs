//! Schema and data maintenance: `migrate`, `seed`, `status`.

use anyhow::Result;
use chrono::Utc;

use super::Settings;

pub async fn migrate(settings: &Settings) -> Result<()> {
    let pool = settings.connect().await?;
    recon_db::migrate(&pool).await?;
    println!("migrations_applied=true");
    Ok(())
}

pub async fn seed(settings: &Settings) -> Result<()> {
    let pool = settings.connect().await?;
    let report = recon_db::seed::seed_sample_data(&pool, Utc::now()).await?;
    println!(
        "seeded=true incoming_inserted={} outgoing_inserted={}",
        report.incoming_inserted, report.outgoing_inserted
    );
    Ok(())
}

pub async fn status(settings: &Settings) -> Result<()> {
    let pool = settings.connect().await?;
    let s = recon_db::status(&pool).await?;
    println!("db_ok={} has_ledger_tables={}", s.ok, s.has_ledger_tables);
    if let (Some(inc), Some(out)) = (s.unreconciled_incoming, s.unreconciled_outgoing) {
        println!("unreconciled_incoming={inc} unreconciled_outgoing={out}");
    }
    Ok(())
}
