//! L1 인메모리 티어.
//!
//! 네임스페이스마다 용량이 고정된 LRU 저장소를 하나씩 둡니다.
//! 최근 사용 순서와 퇴출은 `lru::LruCache`가 관리하고, 여기서는
//! 만료 확인과 퇴출 키 보고만 덧붙입니다.
//!
//! 잠금은 네임스페이스 단위 `Mutex` 하나뿐이고 await 지점을 넘어 유지되지
//! 않습니다. 삽입과 퇴출은 같은 잠금 안에서 한 번에 일어납니다.

use super::entry::CacheEntry;
use chrono::{DateTime, Utc};
use lru::LruCache;
use serde_json::Value;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use tracing::error;

/// 단일 조회 결과.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// 유효한 항목
    Hit(CacheEntry<Value>),
    /// 만료되어 방금 제거된 항목
    Expired,
    /// 항목 없음
    Absent,
}

/// 용량 제한 LRU 저장소.
#[derive(Debug)]
pub struct LruStore {
    cache: LruCache<String, CacheEntry<Value>>,
}

impl LruStore {
    /// 최대 `capacity`개를 보관하는 저장소를 생성합니다. 0은 1로 올립니다.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.cache.contains(key)
    }

    /// 키를 조회합니다. 적중 시 최근 사용으로 표시하고, 만료된 항목은 제거합니다.
    pub fn get(&mut self, key: &str, now: DateTime<Utc>) -> Lookup {
        let expired = match self.cache.peek(key) {
            Some(entry) => entry.is_expired(now),
            None => return Lookup::Absent,
        };

        if expired {
            self.cache.pop(key);
            return Lookup::Expired;
        }

        match self.cache.get(key) {
            Some(entry) => Lookup::Hit(entry.clone()),
            None => Lookup::Absent,
        }
    }

    /// 항목을 삽입하거나 교체합니다.
    ///
    /// 새 키로 인해 용량을 넘으면 가장 오래 사용되지 않은 항목을 퇴출하고
    /// 그 키를 반환합니다. 기존 키 교체는 퇴출을 일으키지 않습니다.
    pub fn insert(&mut self, entry: CacheEntry<Value>) -> Option<String> {
        let key = entry.key.clone();
        // push는 같은 키의 이전 값도 돌려주므로 키가 다를 때만 퇴출
        match self.cache.push(key.clone(), entry) {
            Some((old_key, _)) if old_key != key => Some(old_key),
            _ => None,
        }
    }

    /// 키를 제거합니다. 제거되었으면 true.
    pub fn remove(&mut self, key: &str) -> bool {
        self.cache.pop(key).is_some()
    }

    /// 접두사가 일치하는 모든 키를 제거하고 제거된 키를 반환합니다.
    pub fn remove_prefix(&mut self, prefix: &str) -> Vec<String> {
        let matched: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &matched {
            self.cache.pop(key.as_str());
        }
        matched
    }

    /// 만료된 항목을 모두 제거하고 개수를 반환합니다.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = self
            .cache
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.cache.pop(key.as_str());
        }
        expired.len()
    }

    /// 모든 항목을 제거하고 개수를 반환합니다.
    pub fn clear(&mut self) -> usize {
        let removed = self.cache.len();
        self.cache.clear();
        removed
    }

    /// 최근 사용 순서의 키 목록 (가장 최근이 먼저).
    pub fn keys_by_recency(&self) -> Vec<String> {
        self.cache.iter().map(|(key, _)| key.clone()).collect()
    }
}

/// 네임스페이스별 LRU 저장소 묶음.
///
/// 맵 자체는 생성 이후 변경되지 않으므로 캐시 전역 잠금이 없습니다.
#[derive(Debug)]
pub struct MemoryTier {
    stores: HashMap<String, Mutex<LruStore>>,
}

impl MemoryTier {
    /// `(namespace, capacity)` 목록으로 생성합니다.
    pub fn new<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        let stores = namespaces
            .into_iter()
            .map(|(name, capacity)| (name.into(), Mutex::new(LruStore::new(capacity))))
            .collect();
        Self { stores }
    }

    /// 네임스페이스 저장소에 대해 `f`를 실행합니다. 미등록이면 None.
    pub fn with_store<R>(&self, namespace: &str, f: impl FnOnce(&mut LruStore) -> R) -> Option<R> {
        let store = self.stores.get(namespace)?;
        let mut guard = lock_store(namespace, store);
        Some(f(&mut guard))
    }

    /// 네임스페이스의 현재 상주 항목 수.
    pub fn len(&self, namespace: &str) -> usize {
        self.with_store(namespace, |store| store.len()).unwrap_or(0)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.stores.keys().map(String::as_str)
    }
}

fn lock_store<'a>(namespace: &str, store: &'a Mutex<LruStore>) -> MutexGuard<'a, LruStore> {
    match store.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            error!(namespace, "L1 store mutex poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn entry(key: &str, ttl_secs: u64) -> CacheEntry<Value> {
        CacheEntry::new("ns", key, Value::from(key), now(), Duration::from_secs(ttl_secs))
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut store = LruStore::new(2);
        assert_eq!(store.insert(entry("a", 60)), None);
        assert_eq!(store.insert(entry("b", 60)), None);

        // a를 사용하면 b가 가장 오래된 항목이 됨
        assert!(matches!(store.get("a", now()), Lookup::Hit(_)));
        assert_eq!(store.insert(entry("c", 60)), Some("b".to_string()));

        assert_eq!(store.keys_by_recency(), vec!["c", "a"]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_replace_does_not_evict() {
        let mut store = LruStore::new(2);
        store.insert(entry("a", 60));
        store.insert(entry("b", 60));
        assert_eq!(store.insert(entry("a", 120)), None);
        assert_eq!(store.keys_by_recency(), vec!["a", "b"]);
    }

    #[test]
    fn test_expired_entry_is_purged_on_read() {
        let mut store = LruStore::new(4);
        store.insert(entry("a", 10));

        let later = now() + chrono::Duration::seconds(11);
        assert_eq!(store.get("a", later), Lookup::Expired);
        assert!(!store.contains("a"));
        assert_eq!(store.get("a", later), Lookup::Absent);
    }

    #[test]
    fn test_remove_prefix() {
        let mut store = LruStore::new(8);
        for key in ["AAPL:1d", "AAPL:1h", "MSFT:1d"] {
            store.insert(entry(key, 60));
        }

        let mut removed = store.remove_prefix("AAPL:");
        removed.sort();
        assert_eq!(removed, vec!["AAPL:1d", "AAPL:1h"]);
        assert!(store.remove_prefix("AAPL:").is_empty());

        store.insert(entry("TSLA:1d", 60));
        assert_eq!(store.len(), 2);
        assert_eq!(store.keys_by_recency(), vec!["TSLA:1d", "MSFT:1d"]);
    }

    #[test]
    fn test_purge_expired_and_clear() {
        let mut store = LruStore::new(8);
        store.insert(entry("short", 5));
        store.insert(entry("long", 500));

        assert_eq!(store.purge_expired(now() + chrono::Duration::seconds(6)), 1);
        assert_eq!(store.keys_by_recency(), vec!["long"]);
        assert_eq!(store.clear(), 1);
        assert!(store.is_empty());
        assert!(store.keys_by_recency().is_empty());
    }

    #[test]
    fn test_memory_tier_unknown_namespace() {
        let tier = MemoryTier::new([("known", 4)]);
        assert!(tier.with_store("unknown", |s| s.len()).is_none());
        assert_eq!(tier.len("known"), 0);
    }
}
