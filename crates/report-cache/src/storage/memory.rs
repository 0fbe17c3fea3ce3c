//! 인메모리 L2 저장소.
//!
//! Redis 없이 캐시 매니저와 정리 서비스를 구동할 때 사용합니다.
//! 자체 만료는 하지 않으며(시계 주입과 충돌하므로) 만료 판단은 전적으로
//! 캐시 매니저의 지연 만료에 맡깁니다.

use super::DurableStore;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    ttl: Option<Duration>,
}

/// 인메모리 저장소. 복제본은 같은 데이터를 공유합니다.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<BTreeMap<String, StoredValue>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// TTL 없이 값을 직접 넣습니다 (기존 데이터 시딩용).
    pub async fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.data.write().await.insert(
            key.into(),
            StoredValue {
                value: value.into(),
                ttl: None,
            },
        );
    }

    /// 저장된 모든 키 (정렬됨).
    pub async fn keys(&self) -> Vec<String> {
        self.data.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.data.read().await.contains_key(key)
    }

    /// 마지막 쓰기에 사용된 TTL.
    pub async fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.data.read().await.get(key).and_then(|stored| stored.ttl)
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .data
            .read()
            .await
            .get(key)
            .map(|stored| stored.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.data.write().await.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                ttl: Some(ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.data.write().await.remove(key).is_some())
    }

    async fn delete_if_eq(&self, key: &str, expected: &str) -> Result<bool> {
        let mut data = self.data.write().await;
        if data.get(key).is_some_and(|stored| stored.value == expected) {
            data.remove(key);
            return Ok(true);
        }
        Ok(false)
    }

    async fn scan_prefix(&self, prefix: &str, limit: Option<usize>) -> Result<Vec<String>> {
        let data = self.data.read().await;
        let matching = data
            .range(prefix.to_string()..)
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(prefix))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(matching)
    }

    async fn ping(&self) -> Result<bool> {
        Ok(true)
    }
}
