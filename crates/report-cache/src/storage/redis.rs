//! Redis 기반 L2 저장소.
//!
//! 재연결을 자동으로 처리하는 `ConnectionManager`를 사용합니다.
//! 키 나열은 `KEYS` 대신 `SCAN MATCH`로 수행해 서버를 블로킹하지 않습니다.

use super::DurableStore;
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, Script};
use report_core::RedisConfig;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// 값이 일치할 때만 삭제하는 스크립트.
const COMPARE_AND_DELETE: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

/// Redis가 받아들이는 최대 만료(초).
///
/// 서버는 `현재 시각(ms) + TTL(ms)`이 i64를 넘으면 거부하므로
/// 2100년까지의 시각 여유를 뺍니다.
const MAX_EXPIRE_SECS: u64 = (i64::MAX / 1000 - 4_102_444_800) as u64;

/// Redis 연결 래퍼.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    compare_and_delete: Script,
}

impl RedisStore {
    /// 새로운 Redis 연결을 생성합니다.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        info!("Connecting to Redis...");

        let client = Client::open(config.url.as_str())?;
        let timeout = Duration::from_secs(config.connection_timeout_secs.max(1));

        let connection = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                CacheError::Timeout(format!("Redis connection after {}s", timeout.as_secs()))
            })??;

        info!("Redis connection established");

        Ok(Self {
            connection,
            compare_and_delete: Script::new(COMPARE_AND_DELETE),
        })
    }
}

/// Redis glob 특수문자를 이스케이프합니다.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 4);
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\' | '^') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Redis `SET EX`는 최소 1초 단위이므로 올림하고, 서버 상한으로 자릅니다.
fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl
        .as_secs()
        .saturating_add(u64::from(ttl.subsec_nanos() > 0));
    secs.clamp(1, MAX_EXPIRE_SECS)
}

#[async_trait]
impl DurableStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.set_ex(key, value, ttl_secs(ttl)).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection.clone();
        let deleted: i64 = conn.del(key).await?;
        Ok(deleted > 0)
    }

    async fn delete_if_eq(&self, key: &str, expected: &str) -> Result<bool> {
        let mut conn = self.connection.clone();
        let deleted: i64 = self
            .compare_and_delete
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted > 0)
    }

    #[instrument(skip(self))]
    async fn scan_prefix(&self, prefix: &str, limit: Option<usize>) -> Result<Vec<String>> {
        let pattern = format!("{}*", escape_glob(prefix));
        let mut conn = self.connection.clone();
        let mut keys = Vec::new();

        let mut iter: redis::AsyncIter<String> = conn.scan_match(&pattern).await?;
        while let Some(key) = iter.next_item().await {
            keys.push(key);
            if limit.is_some_and(|max| keys.len() >= max) {
                break;
            }
        }

        debug!(pattern = %pattern, count = keys.len(), "Redis scan complete");
        Ok(keys)
    }

    async fn ping(&self) -> Result<bool> {
        let mut conn = self.connection.clone();
        let result: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(result == "PONG")
    }
}
