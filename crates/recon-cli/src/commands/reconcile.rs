//! `recon` (scheduled loop) and `pass` (one-shot).

use std::sync::Arc;

use anyhow::{Context, Result};
use recon_db::PgLedger;
use recon_engine::{ReconcileEngine, Scheduler};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::Settings;

async fn build_engine(settings: &Settings) -> Result<ReconcileEngine<PgLedger>> {
    let pool = settings.connect().await?;
    let ledger = PgLedger::new(pool).with_commit_retries(settings.config.engine.commit_retries);
    Ok(ReconcileEngine::new(Arc::new(ledger), &settings.config.engine))
}

pub async fn run_loop(settings: &Settings) -> Result<()> {
    let engine = build_engine(settings).await?;
    let scheduler = Scheduler::new(engine, &settings.config.scheduler);

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));

    let summary = scheduler
        .run(cancel)
        .await
        .context("reconciler stopped on a failed pass")?;

    info!(
        passes_completed = summary.passes_completed,
        passes_failed = summary.passes_failed,
        records_reconciled = summary.records_reconciled,
        interrupted_pass = summary.interrupted_pass,
        "reconciler shut down"
    );
    Ok(())
}

pub async fn run_single_pass(settings: &Settings) -> Result<()> {
    let engine = build_engine(settings).await?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));

    let report = engine
        .reconcile_pass(&cancel)
        .await
        .context("reconcile pass failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Cancel `token` on SIGINT (and SIGTERM on unix).
async fn cancel_on_shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received; cancelling"),
        _ = terminate => info!("SIGTERM received; cancelling"),
    }
    token.cancel();
}
