//! Command handler modules for the `recon` binary.
//!
//! Shared setup used by every command path lives here.

pub mod db;
pub mod reconcile;

use anyhow::{Context, Result};
use recon_config::{LoadedConfig, ReconConfig, UnusedKeyPolicy};
use recon_db::PgPool;
use tracing::{info, warn};

/// Resolved process parameters: the layered document plus the typed view
/// after env and flag overrides.
pub struct Settings {
    pub loaded: LoadedConfig,
    pub config: ReconConfig,
}

impl Settings {
    pub fn load(
        config_paths: &[String],
        database_url: Option<String>,
        db_name: Option<String>,
        strict: bool,
    ) -> Result<Self> {
        let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
        let loaded = recon_config::load_layered_yaml(&path_refs)?;

        let policy = if strict {
            UnusedKeyPolicy::Fail
        } else {
            UnusedKeyPolicy::Warn
        };
        let unused = recon_config::report_unused_keys(&loaded.config_json, policy)?;
        if !unused.is_clean() {
            warn!(keys = ?unused.unused_leaf_pointers, "config carries keys the reconciler does not read");
        }

        let config = loaded
            .settings()?
            .apply_process_env()
            .with_overrides(database_url, db_name);
        config.validate().context("invalid reconciler configuration")?;

        info!(
            config_hash = %loaded.config_hash,
            database = %config.database.redacted_url(),
            db_name = %config.database.name,
            "configuration loaded"
        );

        Ok(Self { loaded, config })
    }

    pub async fn connect(&self) -> Result<PgPool> {
        recon_db::connect(&self.config.database).await
    }
}
