//! L2 내구성 저장소.
//!
//! - [`RedisStore`]: 운영용 Redis 구현
//! - [`MemoryStore`]: 테스트 및 Redis 없는 실행용 인메모리 구현
//!
//! 저장소는 원본 데이터가 아니라 best-effort 티어입니다. 같은 키에 대한
//! 동시 쓰기는 마지막 쓰기가 이깁니다.

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// L2 저장소 트레잇.
///
/// 값은 불투명한 문자열입니다. 만료 확인은 캐시 매니저가 읽을 때마다
/// 수행하므로 구현체의 자체 TTL은 보조 수단일 뿐입니다.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// 값을 가져옵니다.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// TTL과 함께 값을 저장합니다 (덮어쓰기).
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// 키를 삭제합니다. 실제로 삭제되었으면 true.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// 현재 값이 `expected`와 같을 때만 원자적으로 삭제합니다.
    ///
    /// 읽은 뒤 다른 쓰기가 끼어들었다면 그 값을 지우지 않고 false를 반환합니다.
    async fn delete_if_eq(&self, key: &str, expected: &str) -> Result<bool>;

    /// 접두사가 일치하는 키를 최대 `limit`개까지 나열합니다.
    async fn scan_prefix(&self, prefix: &str, limit: Option<usize>) -> Result<Vec<String>>;

    /// 연결 상태를 확인합니다.
    async fn ping(&self) -> Result<bool>;
}
