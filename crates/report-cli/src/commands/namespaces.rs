//! 등록된 네임스페이스 목록.

use anyhow::{Context, Result};
use report_cache::NamespaceRegistry;
use serde::Serialize;

/// 네임스페이스 한 줄.
#[derive(Debug, Clone, Serialize)]
pub struct NamespaceRow {
    pub name: String,
    pub key_prefix: String,
    pub band: String,
    pub l1_ttl_secs: u64,
    pub l1_max_entries: usize,
    pub l2_ttl_secs: u64,
    pub version: String,
}

pub fn namespace_rows(registry: &NamespaceRegistry) -> Vec<NamespaceRow> {
    registry
        .descriptors()
        .map(|d| NamespaceRow {
            name: d.name().to_string(),
            key_prefix: d.key_prefix().to_string(),
            band: d.strategy_band().to_string(),
            l1_ttl_secs: d.l1_ttl().as_secs(),
            l1_max_entries: d.l1_max_entries(),
            l2_ttl_secs: d.l2_ttl().as_secs(),
            version: d.version_tag().to_string(),
        })
        .collect()
}

/// 테이블 형식.
pub fn format_table(rows: &[NamespaceRow]) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:<22} {:<24} {:<12} {:>8} {:>8} {:>9} {:<6}\n",
        "NAMESPACE", "PREFIX", "BAND", "L1_TTL", "L1_MAX", "L2_TTL", "VER"
    ));
    output.push_str(&"-".repeat(95));
    output.push('\n');

    for row in rows {
        output.push_str(&format!(
            "{:<22} {:<24} {:<12} {:>7}s {:>8} {:>8}s {:<6}\n",
            row.name,
            row.key_prefix,
            row.band,
            row.l1_ttl_secs,
            row.l1_max_entries,
            row.l2_ttl_secs,
            row.version
        ));
    }

    output.push('\n');
    output.push_str(&format!("Total: {} namespaces", rows.len()));
    output
}

pub fn format_json(rows: &[NamespaceRow]) -> Result<String> {
    serde_json::to_string_pretty(rows).context("Failed to serialize to JSON")
}
