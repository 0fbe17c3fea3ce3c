//! 2단계 캐시 매니저.
//!
//! 빠르고 수명이 짧은 L1(인메모리 LRU)과 크고 오래 가는 L2(내구성 저장소)를
//! 하나의 읽기/쓰기 계약 뒤에 묶습니다.
//!
//! # 조회 흐름
//!
//! ```text
//! get(namespace, key)
//!         │
//!         ▼
//! ┌──────────────────┐  유효   ┌──────────────┐
//! │ 1. L1 조회        │ ─────▶ │ L1 적중 반환   │
//! └────────┬─────────┘        └──────────────┘
//!          │ 없음/만료(즉시 제거)
//! ┌────────▼─────────┐  유효   ┌──────────────────────────┐
//! │ 2. L2 조회        │ ─────▶ │ L1로 승격 후 L2 적중 반환   │
//! └────────┬─────────┘        └──────────────────────────┘
//!          │ 없음/만료(즉시 제거)/오류
//!          ▼
//!       miss 기록
//! ```
//!
//! L2는 원본 데이터가 아니므로 L2 실패는 호출자에게 전달되지 않고
//! 로그와 오류 카운터로만 남습니다. 두 티어 사이의 일관성은 best-effort입니다.

use super::entry::{expiry_after, CacheEntry, CacheHit, CacheTier, Invalidation};
use super::memory::{Lookup, MemoryTier};
use super::registry::NamespaceRegistry;
use crate::error::{CacheError, Result};
use crate::metrics::{
    CacheEvent, CacheMetrics, CacheStats, HealthAssessment, HealthReport, HealthThresholds,
};
use crate::storage::DurableStore;
use report_core::{Clock, NamespaceDescriptor, SystemClock};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// 2단계 캐시 매니저.
///
/// 전역 싱글톤이 아니라 명시적으로 생성해 주입하는 컴포넌트입니다.
/// 초기화는 레지스트리 구성, 정리는 [`CacheManager::clear`]로 수행합니다.
pub struct CacheManager {
    registry: Arc<NamespaceRegistry>,
    l1: MemoryTier,
    l2: Arc<dyn DurableStore>,
    metrics: CacheMetrics,
    thresholds: HealthThresholds,
    clock: Arc<dyn Clock>,
}

impl CacheManager {
    /// 레지스트리를 고정하고 네임스페이스별 L1 저장소와 카운터를 만듭니다.
    pub fn new(registry: NamespaceRegistry, l2: Arc<dyn DurableStore>) -> Self {
        let l1 = MemoryTier::new(
            registry
                .descriptors()
                .map(|d| (d.name().to_string(), d.l1_max_entries())),
        );
        let metrics = CacheMetrics::new(registry.descriptors().map(|d| d.name().to_string()));

        info!(namespaces = registry.len(), "Cache manager initialized");

        Self {
            registry: Arc::new(registry),
            l1,
            l2,
            metrics,
            thresholds: HealthThresholds::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// 시계를 교체합니다.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 헬스 판정 임계값을 교체합니다.
    pub fn with_thresholds(mut self, thresholds: HealthThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn registry(&self) -> &NamespaceRegistry {
        &self.registry
    }

    /// 값을 조회합니다.
    ///
    /// 미등록 네임스페이스만 오류이며, L2 장애는 miss로 처리됩니다.
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<CacheHit<T>>> {
        let descriptor = self.registry.resolve(namespace)?;
        let now = self.clock.now();

        let lookup = self
            .l1
            .with_store(namespace, |store| store.get(key, now))
            .unwrap_or(Lookup::Absent);

        match lookup {
            Lookup::Hit(entry) => {
                return Ok(self.decode_hit(namespace, key, entry.value, CacheTier::L1));
            }
            Lookup::Expired => debug!("L1 entry expired, purged"),
            Lookup::Absent => {}
        }

        let full_key = descriptor.full_key(key);
        let raw = match self.l2.get(&full_key).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "L2 read failed, treating as miss");
                self.metrics.record(namespace, CacheEvent::Error);
                None
            }
        };

        if let Some(raw) = raw {
            match serde_json::from_str::<CacheEntry<Value>>(&raw) {
                Ok(entry) if entry.is_expired(now) => {
                    debug!(expires_at = %entry.expires_at, "L2 entry expired, purging");
                    self.purge_l2(namespace, &full_key, &raw).await;
                }
                Ok(entry) => {
                    let promoted = CacheEntry {
                        key: key.to_string(),
                        value: entry.value.clone(),
                        inserted_at: now,
                        expires_at: entry
                            .expires_at
                            .min(expiry_after(now, descriptor.l1_ttl())),
                        namespace: namespace.to_string(),
                    };
                    let hit = self.decode_hit(namespace, key, entry.value, CacheTier::L2);
                    if hit.is_some() {
                        self.insert_l1(namespace, promoted);
                    }
                    return Ok(hit);
                }
                Err(e) => {
                    warn!(error = %e, "Undecodable L2 entry, purging");
                    self.metrics.record(namespace, CacheEvent::Error);
                    self.purge_l2(namespace, &full_key, &raw).await;
                }
            }
        }

        self.metrics.record(namespace, CacheEvent::Miss);
        Ok(None)
    }

    /// 두 티어에 값을 씁니다.
    ///
    /// `ttl_override`는 L2 TTL을 대체하고, L1 TTL은 `min(l1_ttl, override)`입니다.
    /// L2 쓰기 실패는 기록만 하고 호출은 성공합니다.
    #[instrument(skip(self, value))]
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        namespace: &str,
        key: &str,
        value: &T,
        ttl_override: Option<Duration>,
    ) -> Result<()> {
        let descriptor = self.registry.resolve(namespace)?;
        let l2_ttl = ttl_override.unwrap_or_else(|| descriptor.l2_ttl());
        if l2_ttl.is_zero() {
            return Err(CacheError::InvalidRequest(
                "TTL override must be positive".to_string(),
            ));
        }
        let l1_ttl = descriptor.l1_ttl().min(l2_ttl);

        let value = serde_json::to_value(value)?;
        let now = self.clock.now();
        let envelope = CacheEntry::new(namespace, key, value, now, l2_ttl);
        let raw = serde_json::to_string(&envelope)?;

        self.insert_l1(
            namespace,
            CacheEntry::new(namespace, key, envelope.value, now, l1_ttl),
        );
        self.metrics.record(namespace, CacheEvent::Write);

        if let Err(e) = self.l2.set(&descriptor.full_key(key), &raw, l2_ttl).await {
            warn!(error = %e, "L2 write failed, value cached in L1 only");
            self.metrics.record(namespace, CacheEvent::Error);
        }

        Ok(())
    }

    /// 키 또는 접두사에 해당하는 항목을 두 티어에서 제거합니다.
    ///
    /// 반환값은 어느 한 티어에서라도 제거된 서로 다른 키의 수입니다.
    /// 같은 대상을 다시 무효화하면 0을 반환합니다.
    #[instrument(skip(self))]
    pub async fn invalidate(&self, namespace: &str, target: Invalidation) -> Result<usize> {
        let descriptor = self.registry.resolve(namespace)?;

        match target {
            // L2를 먼저 지워야 그 사이의 조회가 옛 값을 L1로 다시 승격하지 않음
            Invalidation::Key(key) => {
                let in_l2 = match self.l2.delete(&descriptor.full_key(&key)).await {
                    Ok(deleted) => deleted,
                    Err(e) => {
                        warn!(error = %e, "L2 delete failed during invalidation");
                        self.metrics.record(namespace, CacheEvent::Error);
                        false
                    }
                };
                let in_l1 = self
                    .l1
                    .with_store(namespace, |store| store.remove(&key))
                    .unwrap_or(false);
                Ok(usize::from(in_l1 || in_l2))
            }
            Invalidation::Prefix(prefix) => {
                let mut removed: HashSet<String> = self
                    .delete_l2_prefix(&descriptor, &prefix)
                    .await
                    .into_iter()
                    .collect();

                let in_l1 = self
                    .l1
                    .with_store(namespace, |store| store.remove_prefix(&prefix))
                    .unwrap_or_default();
                removed.extend(in_l1);

                debug!(removed = removed.len(), "Prefix invalidated");
                Ok(removed.len())
            }
        }
    }

    /// 네임스페이스 통계. `None`이면 전체 합계입니다.
    pub fn stats(&self, namespace: Option<&str>) -> Result<CacheStats> {
        match namespace {
            Some(name) => {
                self.registry.resolve(name)?;
                Ok(self.namespace_stats(name))
            }
            None => Ok(self
                .stats_by_namespace()
                .values()
                .fold(CacheStats::default(), |acc, s| acc.merge(s))),
        }
    }

    /// 모든 네임스페이스의 통계.
    pub fn stats_by_namespace(&self) -> BTreeMap<String, CacheStats> {
        self.registry
            .descriptors()
            .map(|d| (d.name().to_string(), self.namespace_stats(d.name())))
            .collect()
    }

    /// 운영 상태 엔드포인트용 리포트.
    pub fn health_report(&self) -> HealthReport {
        HealthReport::build(&self.stats_by_namespace(), &self.thresholds)
    }

    /// 전체 헬스 판정.
    pub fn health_status(&self) -> HealthAssessment {
        let report = self.health_report();
        HealthAssessment {
            status: report.status,
            issues: report.issues,
        }
    }

    /// 카운터를 초기화합니다. 캐시 내용은 유지됩니다.
    pub fn reset_stats(&self) {
        self.metrics.reset();
    }

    /// L1의 만료 항목을 일괄 제거합니다. 주기 실행은 호출자 책임입니다.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        self.registry
            .descriptors()
            .map(|d| {
                self.l1
                    .with_store(d.name(), |store| store.purge_expired(now))
                    .unwrap_or(0)
            })
            .sum()
    }

    /// 모든 네임스페이스를 두 티어에서 비웁니다. 반환값은 제거된 L2 키 수입니다.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> usize {
        let mut l2_removed = 0;
        for descriptor in self.registry.descriptors() {
            l2_removed += self.delete_l2_prefix(descriptor, "").await.len();
            self.l1.with_store(descriptor.name(), |store| store.clear());
        }
        info!(l2_removed, "Cache cleared");
        l2_removed
    }

    /// L2 연결 상태. 오류는 false로 취급합니다.
    pub async fn ping_l2(&self) -> bool {
        match self.l2.ping().await {
            Ok(alive) => alive,
            Err(e) => {
                warn!(error = %e, "L2 ping failed");
                false
            }
        }
    }

    fn namespace_stats(&self, namespace: &str) -> CacheStats {
        let mut stats = self.metrics.snapshot(namespace).unwrap_or_default();
        stats.size = self.l1.len(namespace);
        stats
    }

    fn decode_hit<T: DeserializeOwned>(
        &self,
        namespace: &str,
        key: &str,
        value: Value,
        tier: CacheTier,
    ) -> Option<CacheHit<T>> {
        match serde_json::from_value::<T>(value) {
            Ok(value) => {
                let event = match tier {
                    CacheTier::L1 => CacheEvent::L1Hit,
                    CacheTier::L2 => CacheEvent::L2Hit,
                };
                self.metrics.record(namespace, event);
                debug!(%tier, "Cache hit");
                Some(CacheHit { value, tier })
            }
            Err(e) => {
                warn!(key, %tier, error = %e, "Cached value does not match requested type");
                self.metrics.record(namespace, CacheEvent::Error);
                self.metrics.record(namespace, CacheEvent::Miss);
                None
            }
        }
    }

    fn insert_l1(&self, namespace: &str, entry: CacheEntry<Value>) {
        let evicted = self
            .l1
            .with_store(namespace, |store| store.insert(entry))
            .flatten();
        if let Some(evicted) = evicted {
            debug!(evicted = %evicted, "L1 entry evicted");
            self.metrics.record(namespace, CacheEvent::Eviction);
        }
    }

    /// 읽었던 값이 그대로일 때만 L2에서 지웁니다. 그 사이 새로 쓰인 값은 남습니다.
    async fn purge_l2(&self, namespace: &str, full_key: &str, seen: &str) {
        match self.l2.delete_if_eq(full_key, seen).await {
            Ok(true) => {}
            Ok(false) => debug!(key = %full_key, "L2 entry replaced since read, purge skipped"),
            Err(e) => {
                warn!(error = %e, "L2 purge failed");
                self.metrics.record(namespace, CacheEvent::Error);
            }
        }
    }

    /// L2에서 `key_prefix + prefix`로 시작하는 키를 지우고, 지워진 키를
    /// 네임스페이스 상대 키로 반환합니다.
    async fn delete_l2_prefix(&self, descriptor: &NamespaceDescriptor, prefix: &str) -> Vec<String> {
        let namespace = descriptor.name();
        let full_prefix = descriptor.full_key(prefix);

        let keys = match self.l2.scan_prefix(&full_prefix, None).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(namespace, prefix = %full_prefix, error = %e, "L2 scan failed");
                self.metrics.record(namespace, CacheEvent::Error);
                return Vec::new();
            }
        };

        let mut removed = Vec::with_capacity(keys.len());
        for full_key in keys {
            match self.l2.delete(&full_key).await {
                Ok(true) => {
                    let relative = full_key
                        .strip_prefix(descriptor.key_prefix())
                        .unwrap_or(&full_key)
                        .to_string();
                    removed.push(relative);
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(namespace, key = %full_key, error = %e, "L2 delete failed");
                    self.metrics.record(namespace, CacheEvent::Error);
                }
            }
        }
        removed
    }
}
