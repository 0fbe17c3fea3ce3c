//! 설정으로부터 캐시 구성 요소 생성.

use anyhow::{Context, Result};
use report_cache::{CacheManager, DurableStore, HealthThresholds, NamespaceRegistry, RedisStore};
use report_core::AppConfig;
use std::sync::Arc;

/// 기본 도메인과 설정 파일의 추가 네임스페이스를 등록한 레지스트리.
pub fn build_registry(config: &AppConfig) -> Result<NamespaceRegistry> {
    let mut registry = if config.cache.register_domains {
        NamespaceRegistry::with_domains()?
    } else {
        NamespaceRegistry::new()
    };

    let descriptors = config
        .namespace_descriptors()
        .context("Invalid [cache.namespaces] entry")?;
    registry.register_all(descriptors)?;
    Ok(registry)
}

/// Redis 저장소에 연결합니다.
pub async fn connect_store(config: &AppConfig) -> Result<Arc<dyn DurableStore>> {
    let store = RedisStore::connect(&config.redis)
        .await
        .with_context(|| format!("Failed to connect to Redis at {}", config.redis.url))?;
    Ok(Arc::new(store))
}

/// 설정 기반 캐시 매니저.
pub async fn cache_manager(config: &AppConfig) -> Result<CacheManager> {
    let registry = build_registry(config)?;
    let store = connect_store(config).await?;
    Ok(CacheManager::new(registry, store).with_thresholds(HealthThresholds::from(&config.health)))
}
