//! Unused-key guard.
//!
//! Every leaf of the layered document should be read by [`crate::ReconConfig`].
//! A leaf outside the consumed registry is usually a typo (`stalenes_secs`)
//! that would otherwise silently fall back to a default.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::leaves;

/// JSON-pointer prefixes read by the typed settings view.
pub const CONSUMED_POINTERS: &[&str] = &[
    "/database/url",
    "/database/name",
    "/database/max_connections",
    "/engine/staleness_secs",
    "/engine/commit_retries",
    "/scheduler/interval_secs",
    "/scheduler/on_pass_error",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Minimal set of unused leaf pointers (sorted)
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Produce an unused-key report.
/// `Fail` errors when any unused key exists; `Warn` always returns the report.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let consumed: BTreeSet<&str> = CONSUMED_POINTERS.iter().copied().collect();

    let mut unused: Vec<String> = leaves(config_json)
        .into_iter()
        .map(|(pointer, _)| pointer)
        // A scalar root document has the single pseudo-leaf "/".
        .filter(|lp| lp != "/")
        .filter(|lp| !consumed.iter().any(|cp| is_prefix_pointer(cp, lp)))
        .collect();
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config leaf key(s) detected. First few: {:?}",
            report.unused_leaf_pointers.len(),
            report.unused_leaf_pointers.iter().take(12).collect::<Vec<_>>()
        );
    }

    Ok(report)
}

/// "/a/b" consumes "/a/b" and "/a/b/c" but NOT "/a/bc".
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    if leaf == prefix {
        return true;
    }
    leaf.strip_prefix(prefix)
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_requires_segment_boundary() {
        assert!(is_prefix_pointer("/database/url", "/database/url"));
        assert!(!is_prefix_pointer("/database/url", "/database/urls"));
        assert!(is_prefix_pointer("/database", "/database/url"));
    }
}
