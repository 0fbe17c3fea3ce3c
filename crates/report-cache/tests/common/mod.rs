//! 통합 테스트 공용 도구.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use report_cache::{CacheError, CacheManager, DurableStore, MemoryStore, NamespaceRegistry, Result};
use report_core::ManualClock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// 보류된 L2 삭제를 제어하는 핸들.
#[derive(Debug, Default)]
pub struct DeleteGate {
    /// 삭제가 보류 지점에 도달하면 알림
    pub entered: Notify,
    /// 보류된 삭제를 진행시킴
    pub release: Notify,
}

/// 장애를 주입할 수 있는 저장소 래퍼.
#[derive(Debug, Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    fail_scan: AtomicBool,
    fail_delete_keys: Mutex<HashSet<String>>,
    write_after_get: Mutex<Option<(String, String)>>,
    delete_gate: Mutex<Option<Arc<DeleteGate>>>,
}

impl FaultyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_set(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    pub fn fail_scan(&self, fail: bool) {
        self.fail_scan.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete_of(&self, key: &str) {
        self.fail_delete_keys.lock().unwrap().insert(key.to_string());
    }

    /// 다음 `key` 조회가 값을 읽은 직후, 다른 작성자가 `value`를 쓴 것처럼 만듭니다.
    pub fn write_after_next_get(&self, key: &str, value: &str) {
        *self.write_after_get.lock().unwrap() = Some((key.to_string(), value.to_string()));
    }

    /// 다음 `delete`를 gate가 풀릴 때까지 보류합니다.
    pub fn hold_next_delete(&self) -> Arc<DeleteGate> {
        let gate = Arc::new(DeleteGate::default());
        *self.delete_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    fn injected(operation: &str) -> CacheError {
        CacheError::StorageTier(format!("injected {} failure", operation))
    }
}

#[async_trait]
impl DurableStore for FaultyStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(Self::injected("get"));
        }
        let value = self.inner.get(key).await?;

        let racing = {
            let mut pending = self.write_after_get.lock().unwrap();
            match pending.as_ref() {
                Some((target, _)) if target == key => pending.take(),
                _ => None,
            }
        };
        if let Some((key, fresh)) = racing {
            self.inner.set(&key, &fresh, Duration::from_secs(3600)).await?;
        }

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(Self::injected("set"));
        }
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        if self.fail_delete_keys.lock().unwrap().contains(key) {
            return Err(Self::injected("delete"));
        }
        let gate = self.delete_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        self.inner.delete(key).await
    }

    async fn delete_if_eq(&self, key: &str, expected: &str) -> Result<bool> {
        if self.fail_delete_keys.lock().unwrap().contains(key) {
            return Err(Self::injected("delete"));
        }
        self.inner.delete_if_eq(key, expected).await
    }

    async fn scan_prefix(&self, prefix: &str, limit: Option<usize>) -> Result<Vec<String>> {
        if self.fail_scan.load(Ordering::SeqCst) {
            return Err(Self::injected("scan"));
        }
        self.inner.scan_prefix(prefix, limit).await
    }

    async fn ping(&self) -> Result<bool> {
        Ok(!self.fail_get.load(Ordering::SeqCst))
    }
}

/// 2025-02-10 00:00:00 UTC에 고정된 시계.
pub fn fixed_clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2025, 2, 10, 0, 0, 0).unwrap())
}

/// 기본 도메인이 등록된 매니저와 그 저장소/시계.
pub fn domain_cache() -> (Arc<CacheManager>, Arc<FaultyStore>, ManualClock) {
    let store = Arc::new(FaultyStore::new(MemoryStore::new()));
    let clock = fixed_clock();
    let cache = CacheManager::new(NamespaceRegistry::with_domains().unwrap(), store.clone())
        .with_clock(Arc::new(clock.clone()));
    (Arc::new(cache), store, clock)
}
