//! 설정 파일 로딩 통합 테스트.

use report_core::{AppConfig, StrategyBand};
use std::path::PathBuf;
use std::time::Duration;

fn write_temp_config(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "report-core-{}-{}.toml",
        name,
        std::process::id()
    ));
    std::fs::write(&path, contents).expect("임시 설정 파일 쓰기 실패");
    path
}

#[test]
fn test_load_from_file_with_env_override() {
    let path = write_temp_config(
        "full",
        r#"
            [redis]
            url = "redis://cache.internal:6379/2"

            [logging]
            level = "debug"
            format = "json"

            [health]
            l1_hit_rate_floor = 0.8

            [retention]
            prefixes = ["analysis_", "articles_"]
            retention_days = 30

            [[cache.namespaces]]
            name = "sentiment_analysis"
            band = "batch"
            l2_ttl_secs = 3600
            l1_max_entries = 100
        "#,
    );

    std::env::set_var("REPORT__RETENTION__LIMIT_PER_PREFIX", "250");
    let config = AppConfig::load(&path).expect("설정 로드 실패");
    std::env::remove_var("REPORT__RETENTION__LIMIT_PER_PREFIX");
    let _ = std::fs::remove_file(&path);

    assert_eq!(config.redis.url, "redis://cache.internal:6379/2");
    assert_eq!(config.redis.connection_timeout_secs, 5);
    assert_eq!(config.logging.format, "json");

    // 일부만 지정된 섹션은 나머지 기본값을 유지
    assert_eq!(config.health.l1_hit_rate_floor, 0.8);
    assert_eq!(config.health.l2_hit_rate_floor, 0.60);
    assert!(config.health.enabled);

    assert_eq!(config.retention.prefixes, vec!["analysis_", "articles_"]);
    assert_eq!(config.retention.retention_days, 30);
    assert_eq!(config.retention.limit_per_prefix, 250);
    assert_eq!(config.retention.sample_limit, 20);

    assert!(config.cache.register_domains);
    let descriptors = config.namespace_descriptors().unwrap();
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].strategy_band(), StrategyBand::Batch);
    assert_eq!(descriptors[0].l1_ttl(), Duration::from_secs(60));
}

#[test]
fn test_missing_file_uses_defaults() {
    let path = std::env::temp_dir().join("report-core-does-not-exist.toml");
    let config = AppConfig::load(&path).expect("기본값으로 로드되어야 함");

    assert_eq!(config.redis.url, "redis://localhost:6379/0");
    assert_eq!(config.logging.level, "info");
    assert!(config.cache.namespaces.is_empty());
}
