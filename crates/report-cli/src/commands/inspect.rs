//! 캐시 항목 조회/무효화 명령.

use anyhow::Result;
use report_cache::{CacheManager, Invalidation};
use serde::Serialize;
use serde_json::Value;

/// 조회 결과.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResult {
    pub namespace: String,
    pub key: String,
    /// `L1`, `L2`, 또는 `miss`
    pub tier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

pub async fn lookup(cache: &CacheManager, namespace: &str, key: &str) -> Result<LookupResult> {
    let hit = cache.get::<Value>(namespace, key).await?;
    Ok(LookupResult {
        namespace: namespace.to_string(),
        key: key.to_string(),
        tier: hit
            .as_ref()
            .map_or_else(|| "miss".to_string(), |h| h.tier.to_string()),
        value: hit.map(|h| h.value),
    })
}

/// 무효화 결과.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvalidateResult {
    pub namespace: String,
    pub target: String,
    pub removed: usize,
}

/// 키 또는 접두사 중 하나를 무효화합니다.
pub async fn invalidate(
    cache: &CacheManager,
    namespace: &str,
    key: Option<String>,
    prefix: Option<String>,
) -> Result<InvalidateResult> {
    let (target, label) = match (key, prefix) {
        (Some(key), None) => (Invalidation::Key(key.clone()), key),
        (None, Some(prefix)) => (Invalidation::Prefix(prefix.clone()), format!("{}*", prefix)),
        _ => anyhow::bail!("Specify exactly one of --key or --prefix"),
    };

    let removed = cache.invalidate(namespace, target).await?;
    Ok(InvalidateResult {
        namespace: namespace.to_string(),
        target: label,
        removed,
    })
}
