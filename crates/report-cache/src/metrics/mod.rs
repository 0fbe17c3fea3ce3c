//! 캐시 메트릭 수집과 헬스 판정.

pub mod collector;
pub mod health;

pub use collector::{CacheEvent, CacheMetrics, CacheStats};
pub use health::{
    evaluate, HealthAssessment, HealthReport, HealthStatus, HealthThresholds, NamespaceHealth,
};
