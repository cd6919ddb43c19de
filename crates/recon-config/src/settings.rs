//! Typed settings view over the layered config document.
//!
//! Precedence, lowest first: serde defaults, YAML layers, environment
//! (`RECON_DATABASE_URL`, `RECON_DB_NAME`), then explicit CLI flags applied by
//! the caller through [`ReconConfig::with_overrides`].
//!
//! The resulting value is passed into constructors. Nothing below the CLI
//! reads the environment.

use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const ENV_DB_URL: &str = "RECON_DATABASE_URL";
pub const ENV_DB_NAME: &str = "RECON_DB_NAME";

pub const DEFAULT_DB_URL: &str = "postgres://localhost:5432";
pub const DEFAULT_DB_NAME: &str = "recon";

/// Records younger than this are not yet eligible for matching.
pub const DEFAULT_STALENESS_SECS: u64 = 10 * 60;
pub const DEFAULT_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_COMMIT_RETRIES: u32 = 3;

/// One day. Longer intervals are almost certainly a unit mistake.
pub const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;
/// One year.
pub const MAX_STALENESS_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    pub database: DatabaseConfig,
    pub engine: EngineConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection endpoint. May carry credentials when it comes from the environment.
    pub url: String,
    /// Database selected on the endpoint.
    pub name: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DB_URL.to_string(),
            name: DEFAULT_DB_NAME.to_string(),
            max_connections: 10,
        }
    }
}

impl DatabaseConfig {
    /// Endpoint with any password replaced, safe for logs.
    pub fn redacted_url(&self) -> String {
        redact_url_password(&self.url)
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.redacted_url())
            .field("name", &self.name)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub staleness_secs: u64,
    /// Extra attempts the store makes after a transient commit conflict before failing the pair.
    pub commit_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            staleness_secs: DEFAULT_STALENESS_SECS,
            commit_retries: DEFAULT_COMMIT_RETRIES,
        }
    }
}

impl EngineConfig {
    pub fn staleness(&self) -> Duration {
        Duration::from_secs(self.staleness_secs)
    }
}

/// What the scheduler does when a pass fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassErrorPolicy {
    /// Stop the loop and surface the error (process exits non-zero).
    #[default]
    Halt,
    /// Log the error and wait for the next tick.
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub interval_secs: u64,
    pub on_pass_error: PassErrorPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            on_pass_error: PassErrorPolicy::Halt,
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl ReconConfig {
    /// Apply environment overrides using the given lookup (normally `std::env::var`).
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_DB_URL).filter(|s| !s.trim().is_empty()) {
            self.database.url = url;
        }
        if let Some(name) = lookup(ENV_DB_NAME).filter(|s| !s.trim().is_empty()) {
            self.database.name = name;
        }
        self
    }

    pub fn apply_process_env(self) -> Self {
        self.apply_env(|k| std::env::var(k).ok())
    }

    /// Apply explicit overrides (CLI flags). `None` keeps the current value.
    pub fn with_overrides(mut self, database_url: Option<String>, db_name: Option<String>) -> Self {
        if let Some(url) = database_url {
            self.database.url = url;
        }
        if let Some(name) = db_name {
            self.database.name = name;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            bail!("database.url must not be empty");
        }
        if self.database.name.trim().is_empty() {
            bail!("database.name must not be empty");
        }
        if self.database.max_connections == 0 {
            bail!("database.max_connections must be > 0");
        }
        if self.scheduler.interval_secs == 0 {
            bail!("scheduler.interval_secs must be > 0");
        }
        if self.scheduler.interval_secs > MAX_INTERVAL_SECS {
            bail!(
                "scheduler.interval_secs must be <= {MAX_INTERVAL_SECS}, got {}",
                self.scheduler.interval_secs
            );
        }
        if self.engine.staleness_secs > MAX_STALENESS_SECS {
            bail!(
                "engine.staleness_secs must be <= {MAX_STALENESS_SECS}, got {}",
                self.engine.staleness_secs
            );
        }
        Ok(())
    }
}

fn redact_url_password(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let (authority, tail) = match rest.find('/') {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    let Some((userinfo, host)) = authority.rsplit_once('@') else {
        return url.to_string();
    };
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:REDACTED@{host}{tail}"),
        None => url.to_string(),
    }
}
