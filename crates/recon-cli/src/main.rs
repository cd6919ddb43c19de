//! `recon` binary: runs the reconciler loop and its maintenance commands.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::Settings;

#[derive(Parser)]
#[command(name = "recon")]
#[command(about = "Dual-ledger transaction reconciler", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (base -> env -> local ...)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    /// Database name (overrides config and RECON_DB_NAME)
    #[arg(long, global = true)]
    db_name: Option<String>,

    /// Connection endpoint, e.g. postgres://user@host:5432 (overrides config and RECON_DATABASE_URL)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Fail instead of warn when the config carries keys the reconciler does not read
    #[arg(long, global = true, default_value_t = false)]
    strict_config: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run reconcile passes on the configured interval until SIGINT/SIGTERM
    Recon,

    /// Run exactly one reconcile pass and print its report as JSON
    Pass,

    /// Apply schema migrations (tables, txn_id uniqueness, scan indexes)
    Migrate,

    /// Insert the sample ledger (idempotent)
    Seed,

    /// Print connectivity, schema presence and unreconciled counts
    Status,

    /// Compute layered config hash + print canonical JSON
    ConfigHash,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();
    let settings = Settings::load(
        &cli.config_paths,
        cli.database_url,
        cli.db_name,
        cli.strict_config,
    )?;

    match cli.cmd {
        Commands::Recon => commands::reconcile::run_loop(&settings).await?,
        Commands::Pass => commands::reconcile::run_single_pass(&settings).await?,
        Commands::Migrate => commands::db::migrate(&settings).await?,
        Commands::Seed => commands::db::seed(&settings).await?,
        Commands::Status => commands::db::status(&settings).await?,
        Commands::ConfigHash => {
            println!("config_hash={}", settings.loaded.config_hash);
            println!("{}", settings.loaded.canonical_json);
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
