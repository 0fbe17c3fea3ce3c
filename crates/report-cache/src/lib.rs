//! 리포트 데이터 캐시 및 복원력 있는 조회.
//!
//! 이 crate는 다음을 제공합니다:
//! - 2단계 캐시 (인메모리 LRU + Redis) 와 네임스페이스 레지스트리
//! - 네임스페이스별 캐시 통계와 임계값 기반 헬스 판정
//! - 중복 제거 폴백 체인 조회기
//! - 날짜 키 보존 기간 정리

pub mod cache;
pub mod error;
pub mod fetcher;
pub mod metrics;
pub mod retention;
pub mod storage;

pub use error::{CacheError, Result};

// 캐시 타입 재내보내기
pub use cache::{
    CacheEntry, CacheHit, CacheManager, CacheTier, DataDomain, Invalidation, NamespaceRegistry,
};

// 메트릭/헬스 재내보내기
pub use metrics::{CacheStats, HealthAssessment, HealthReport, HealthStatus, HealthThresholds};

// 폴백 조회 재내보내기
pub use fetcher::{
    AttemptOutcome, FallbackAttemptRecord, FallbackChain, FallbackFetcher, FetchOutcome,
    FetchStrategy,
};

// 정리 서비스 재내보내기
pub use retention::{CleanupReport, CleanupRequest, RetentionCandidate, RetentionCleaner};

// 저장소 재내보내기
pub use storage::{DurableStore, MemoryStore, RedisStore};
