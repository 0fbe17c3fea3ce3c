//! 2단계 캐시.
//!
//! - [`entry`]: 캐시 항목, 티어, 무효화 대상
//! - [`memory`]: 네임스페이스별 L1 LRU 저장소
//! - [`registry`]: 네임스페이스 레지스트리와 기본 데이터 도메인
//! - [`manager`]: L1/L2 조회, 승격, 쓰기, 무효화

pub mod entry;
pub mod manager;
pub mod memory;
pub mod registry;

pub use entry::{CacheEntry, CacheHit, CacheTier, Invalidation};
pub use manager::CacheManager;
pub use memory::{Lookup, LruStore, MemoryTier};
pub use registry::{DataDomain, NamespaceRegistry};
