//! 2단계 캐시 매니저 통합 테스트.

mod common;

use common::{domain_cache, FaultyStore};
use report_cache::{
    CacheEntry, CacheError, CacheManager, CacheTier, HealthStatus, HealthThresholds, Invalidation,
    MemoryStore, NamespaceRegistry,
};
use report_core::{Clock, ManualClock, NamespaceDescriptor, StrategyBand};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Sentiment {
    symbol: String,
    score: f64,
}

fn sentiment(symbol: &str, score: f64) -> Sentiment {
    Sentiment {
        symbol: symbol.to_string(),
        score,
    }
}

#[tokio::test]
async fn test_set_then_get_hits_l1() {
    let (cache, _store, _clock) = domain_cache();
    let value = sentiment("AAPL", 0.42);

    cache
        .set("sentiment_analysis", "AAPL", &value, None)
        .await
        .unwrap();
    let hit = cache
        .get::<Sentiment>("sentiment_analysis", "AAPL")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(hit.value, value);
    assert_eq!(hit.tier, CacheTier::L1);
}

#[tokio::test]
async fn test_sentiment_analysis_l2_hit_and_repromotion() {
    let (cache, store, clock) = domain_cache();
    let value = sentiment("TSLA", -0.1);

    cache
        .set("sentiment_analysis", "TSLA", &value, None)
        .await
        .unwrap();
    assert_eq!(
        store.inner.ttl_of("sentiment_analysis:TSLA").await,
        Some(Duration::from_secs(3600))
    );

    let first = cache.get::<Sentiment>("sentiment_analysis", "TSLA").await.unwrap().unwrap();
    assert_eq!(first.tier, CacheTier::L1);

    // L1 TTL(60초) 경과, L2(3600초)는 유효
    clock.advance_secs(61);
    let second = cache.get::<Sentiment>("sentiment_analysis", "TSLA").await.unwrap().unwrap();
    assert_eq!(second.tier, CacheTier::L2);
    assert_eq!(second.value, value);

    // L1으로 재승격
    let third = cache.get::<Sentiment>("sentiment_analysis", "TSLA").await.unwrap().unwrap();
    assert_eq!(third.tier, CacheTier::L1);

    let stats = cache.stats(Some("sentiment_analysis")).unwrap();
    assert_eq!(stats.l1_hits, 2);
    assert_eq!(stats.l2_hits, 1);
    assert_eq!(stats.misses, 0);
    assert_eq!(stats.size, 1);
}

#[tokio::test]
async fn test_promoted_entry_never_outlives_l2_expiry() {
    let (cache, _store, clock) = domain_cache();
    cache
        .set("sentiment_analysis", "NVDA", &sentiment("NVDA", 0.9), None)
        .await
        .unwrap();

    // L2 만료 30초 전에 승격
    clock.advance_secs(3570);
    let hit = cache.get::<Sentiment>("sentiment_analysis", "NVDA").await.unwrap().unwrap();
    assert_eq!(hit.tier, CacheTier::L2);

    clock.advance_secs(31);
    assert!(cache
        .get::<Sentiment>("sentiment_analysis", "NVDA")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_expired_entry_is_miss_and_not_resident() {
    let (cache, store, clock) = domain_cache();
    cache
        .set("money_flow", "005930", &0.37f64, None)
        .await
        .unwrap();
    assert_eq!(cache.stats(Some("money_flow")).unwrap().size, 1);

    clock.advance_secs(61);
    assert!(cache.get::<f64>("money_flow", "005930").await.unwrap().is_none());

    let stats = cache.stats(Some("money_flow")).unwrap();
    assert_eq!(stats.size, 0);
    assert_eq!(stats.misses, 1);
    assert!(!store.inner.contains("money_flow:005930").await);
}

#[tokio::test]
async fn test_expired_purge_keeps_concurrent_fresh_write() {
    let (cache, store, clock) = domain_cache();
    cache
        .set("sentiment_analysis", "AMD", &sentiment("AMD", 0.1), None)
        .await
        .unwrap();

    clock.advance_secs(3601);

    // 만료된 값을 읽은 직후 다른 작성자가 새 값을 씀
    let fresh = CacheEntry::new(
        "sentiment_analysis",
        "AMD",
        serde_json::to_value(sentiment("AMD", 0.8)).unwrap(),
        clock.now(),
        Duration::from_secs(3600),
    );
    store.write_after_next_get(
        "sentiment_analysis:AMD",
        &serde_json::to_string(&fresh).unwrap(),
    );

    assert!(cache
        .get::<Sentiment>("sentiment_analysis", "AMD")
        .await
        .unwrap()
        .is_none());
    assert!(store.inner.contains("sentiment_analysis:AMD").await);

    let hit = cache
        .get::<Sentiment>("sentiment_analysis", "AMD")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hit.tier, CacheTier::L2);
    assert_eq!(hit.value, sentiment("AMD", 0.8));
}

#[tokio::test]
async fn test_read_during_invalidation_does_not_repromote() {
    let (cache, store, _clock) = domain_cache();
    cache
        .set("market_indicators", "VIX", &17.2f64, None)
        .await
        .unwrap();

    let gate = store.hold_next_delete();
    let invalidation = tokio::spawn({
        let cache = Arc::clone(&cache);
        async move {
            cache
                .invalidate("market_indicators", Invalidation::key("VIX"))
                .await
        }
    });

    // L2 삭제가 보류된 동안의 조회
    gate.entered.notified().await;
    let during = cache.get::<f64>("market_indicators", "VIX").await.unwrap();
    assert_eq!(during.map(|hit| hit.tier), Some(CacheTier::L1));

    gate.release.notify_one();
    assert_eq!(invalidation.await.unwrap().unwrap(), 1);

    assert!(cache
        .get::<f64>("market_indicators", "VIX")
        .await
        .unwrap()
        .is_none());
    assert!(!store.inner.contains("market_indicators:VIX").await);
}

#[tokio::test]
async fn test_unbounded_ttl_override_is_accepted() {
    let (cache, store, _clock) = domain_cache();
    cache
        .set("money_flow", "000660", &0.5f64, Some(Duration::MAX))
        .await
        .unwrap();

    assert_eq!(store.inner.ttl_of("money_flow:000660").await, Some(Duration::MAX));
    let hit = cache.get::<f64>("money_flow", "000660").await.unwrap().unwrap();
    assert_eq!(hit.value, 0.5);
    assert_eq!(cache.stats(Some("money_flow")).unwrap().errors, 0);
}

#[tokio::test]
async fn test_invalidate_key_is_idempotent() {
    let (cache, _store, _clock) = domain_cache();
    cache
        .set("market_indicators", "VIX", &17.2f64, None)
        .await
        .unwrap();

    let first = cache
        .invalidate("market_indicators", Invalidation::key("VIX"))
        .await
        .unwrap();
    let second = cache
        .invalidate("market_indicators", Invalidation::key("VIX"))
        .await
        .unwrap();

    assert_eq!(first, 1);
    assert_eq!(second, 0);
    assert!(cache
        .get::<f64>("market_indicators", "VIX")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_invalidate_prefix_counts_distinct_keys_across_tiers() {
    let (cache, store, clock) = domain_cache();
    cache.set("money_flow", "KR:005930", &1.0f64, None).await.unwrap();
    cache.set("money_flow", "KR:000660", &2.0f64, None).await.unwrap();
    cache.set("money_flow", "US:AAPL", &3.0f64, None).await.unwrap();

    // L1에서만 만료, L2에는 남아 있음
    clock.advance_secs(11);
    cache.purge_expired();
    cache.set("money_flow", "KR:035420", &4.0f64, None).await.unwrap();

    let removed = cache
        .invalidate("money_flow", Invalidation::prefix("KR:"))
        .await
        .unwrap();

    assert_eq!(removed, 3);
    assert_eq!(store.inner.keys().await, vec!["money_flow:US:AAPL".to_string()]);
}

#[tokio::test]
async fn test_l2_write_failure_is_recorded_not_raised() {
    let (cache, store, _clock) = domain_cache();
    store.fail_set(true);

    cache
        .set("article_pool", "fed-minutes", &vec!["a", "b"], None)
        .await
        .unwrap();

    let hit = cache
        .get::<Vec<String>>("article_pool", "fed-minutes")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hit.tier, CacheTier::L1);

    let stats = cache.stats(Some("article_pool")).unwrap();
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.writes, 1);
    assert!(store.inner.is_empty().await);
}

#[tokio::test]
async fn test_l2_read_failure_is_miss() {
    let (cache, store, clock) = domain_cache();
    cache.set("money_flow", "BTC", &0.5f64, None).await.unwrap();

    clock.advance_secs(11);
    store.fail_get(true);

    assert!(cache.get::<f64>("money_flow", "BTC").await.unwrap().is_none());
    let stats = cache.stats(Some("money_flow")).unwrap();
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.misses, 1);
    assert!(!cache.ping_l2().await);
}

#[tokio::test]
async fn test_undecodable_l2_entry_is_purged() {
    let (cache, store, _clock) = domain_cache();
    store
        .inner
        .insert_raw("market_indicators:DXY", "not json")
        .await;

    assert!(cache
        .get::<f64>("market_indicators", "DXY")
        .await
        .unwrap()
        .is_none());
    assert!(!store.inner.contains("market_indicators:DXY").await);
    assert_eq!(cache.stats(Some("market_indicators")).unwrap().errors, 1);
}

#[tokio::test]
async fn test_unregistered_namespace_fails_fast() {
    let (cache, _store, _clock) = domain_cache();

    let err = cache.get::<f64>("crypto_ticks", "BTC").await.unwrap_err();
    assert!(matches!(err, CacheError::Configuration(_)));

    let err = cache
        .invalidate("crypto_ticks", Invalidation::key("BTC"))
        .await
        .unwrap_err();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_l1_eviction_is_counted() {
    let mut registry = NamespaceRegistry::new();
    registry
        .register(
            NamespaceDescriptor::builder("tiny", StrategyBand::Interactive)
                .l1_max_entries(2)
                .build()
                .unwrap(),
        )
        .unwrap();
    let cache = CacheManager::new(registry, Arc::new(MemoryStore::new()))
        .with_clock(Arc::new(ManualClock::starting_now()));

    cache.set("tiny", "a", &1u8, None).await.unwrap();
    cache.set("tiny", "b", &2u8, None).await.unwrap();
    cache.get::<u8>("tiny", "a").await.unwrap();
    cache.set("tiny", "c", &3u8, None).await.unwrap();

    let stats = cache.stats(Some("tiny")).unwrap();
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.size, 2);

    // b가 제거되었으므로 L2에서 찾음
    let b = cache.get::<u8>("tiny", "b").await.unwrap().unwrap();
    assert_eq!(b.tier, CacheTier::L2);
    let a = cache.get::<u8>("tiny", "a").await.unwrap().unwrap();
    assert_eq!(a.tier, CacheTier::L2);
}

#[tokio::test]
async fn test_health_report_reflects_hit_rates() {
    let store = Arc::new(FaultyStore::new(MemoryStore::new()));
    let thresholds = HealthThresholds {
        min_samples: 4,
        ..HealthThresholds::default()
    };
    let cache = CacheManager::new(NamespaceRegistry::with_domains().unwrap(), store)
        .with_clock(Arc::new(common::fixed_clock()))
        .with_thresholds(thresholds);

    cache.set("market_indicators", "VIX", &17.0f64, None).await.unwrap();
    for _ in 0..4 {
        cache.get::<f64>("market_indicators", "VIX").await.unwrap();
    }
    let report = cache.health_report();
    assert_eq!(report.status, HealthStatus::Healthy);
    assert_eq!(report.per_namespace["market_indicators"].l1_hit_rate, 1.0);

    for key in ["A", "B", "C", "D", "E", "F", "G", "H"] {
        cache.get::<f64>("market_indicators", key).await.unwrap();
    }
    let status = cache.health_status();
    assert_eq!(status.status, HealthStatus::Unhealthy);
    assert!(status
        .issues
        .iter()
        .all(|issue| issue.starts_with("market_indicators: ")));

    cache.reset_stats();
    assert_eq!(cache.health_status().status, HealthStatus::Healthy);
}

#[tokio::test]
async fn test_clear_empties_both_tiers() {
    let (cache, store, _clock) = domain_cache();
    cache.set("money_flow", "A", &1.0f64, None).await.unwrap();
    cache.set("article_pool", "B", &"x", None).await.unwrap();
    store.inner.insert_raw("unrelated:key", "keep").await;

    let removed = cache.clear().await;

    assert_eq!(removed, 2);
    assert_eq!(cache.stats(None).unwrap().size, 0);
    assert_eq!(store.inner.keys().await, vec!["unrelated:key".to_string()]);
}

#[tokio::test]
#[ignore] // 실제 Redis 필요
async fn test_cache_manager_with_redis() {
    use report_cache::RedisStore;
    use report_core::RedisConfig;

    let store = RedisStore::connect(&RedisConfig::default()).await.unwrap();
    let cache = CacheManager::new(NamespaceRegistry::with_domains().unwrap(), Arc::new(store));

    cache
        .set("money_flow", "it:redis", &0.25f64, None)
        .await
        .unwrap();
    cache.purge_expired();
    let hit = cache.get::<f64>("money_flow", "it:redis").await.unwrap().unwrap();
    assert_eq!(hit.value, 0.25);

    cache
        .invalidate("money_flow", Invalidation::key("it:redis"))
        .await
        .unwrap();
}
