//! 네임스페이스별 캐시 카운터.
//!
//! 카운터 맵은 생성 시점에 레지스트리로부터 한 번 만들어지고, 이후에는
//! 원자적 증가만 일어납니다. 같은 이벤트는 `metrics` 파사드로도 내보내므로
//! 레코더가 설치되어 있으면 Prometheus 등에서 그대로 수집됩니다.

use metrics::counter;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

/// 캐시 매니저가 보고하는 단일 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    L1Hit,
    L2Hit,
    Miss,
    Eviction,
    Error,
    Write,
}

impl CacheEvent {
    fn label(&self) -> &'static str {
        match self {
            Self::L1Hit => "l1_hit",
            Self::L2Hit => "l2_hit",
            Self::Miss => "miss",
            Self::Eviction => "eviction",
            Self::Error => "error",
            Self::Write => "write",
        }
    }
}

/// 네임스페이스 캐시 통계 (누적, 읽기 전용 스냅샷).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub l1_hits: u64,
    pub l2_hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub errors: u64,
    /// `get` 호출 수 (l1_hits + l2_hits + misses)
    pub total_requests: u64,
    /// `set` 호출 수
    pub writes: u64,
    /// 현재 L1 상주 항목 수
    pub size: usize,
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl CacheStats {
    /// (L1 + L2 적중) / 전체 요청.
    pub fn overall_hit_rate(&self) -> f64 {
        ratio(self.l1_hits + self.l2_hits, self.total_requests)
    }

    /// L1 적중 / 전체 요청.
    pub fn l1_hit_rate(&self) -> f64 {
        ratio(self.l1_hits, self.total_requests)
    }

    /// L2 적중 / 전체 요청. L1 적중률과 독립적으로 해석됩니다.
    pub fn l2_hit_rate(&self) -> f64 {
        ratio(self.l2_hits, self.total_requests)
    }

    /// L2까지 내려간 조회 중 L2가 적중한 비율. L2를 조회한 적이 없으면 None.
    pub fn l2_lookup_hit_rate(&self) -> Option<f64> {
        let lookups = self.l2_hits + self.misses;
        (lookups > 0).then(|| ratio(self.l2_hits, lookups))
    }

    /// 오류 / (조회 + 쓰기).
    pub fn error_rate(&self) -> f64 {
        ratio(self.errors, self.operations())
    }

    /// 조회와 쓰기를 합한 연산 수.
    pub fn operations(&self) -> u64 {
        self.total_requests + self.writes
    }

    /// 두 스냅샷을 합산합니다.
    pub fn merge(&self, other: &CacheStats) -> CacheStats {
        CacheStats {
            l1_hits: self.l1_hits + other.l1_hits,
            l2_hits: self.l2_hits + other.l2_hits,
            misses: self.misses + other.misses,
            evictions: self.evictions + other.evictions,
            errors: self.errors + other.errors,
            total_requests: self.total_requests + other.total_requests,
            writes: self.writes + other.writes,
            size: self.size + other.size,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    l1_hits: AtomicU64,
    l2_hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    errors: AtomicU64,
    writes: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> CacheStats {
        let l1_hits = self.l1_hits.load(Ordering::Relaxed);
        let l2_hits = self.l2_hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        CacheStats {
            l1_hits,
            l2_hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            total_requests: l1_hits + l2_hits + misses,
            writes: self.writes.load(Ordering::Relaxed),
            size: 0,
        }
    }

    fn reset(&self) {
        for counter in [
            &self.l1_hits,
            &self.l2_hits,
            &self.misses,
            &self.evictions,
            &self.errors,
            &self.writes,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// 메트릭 수집기.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    counters: HashMap<String, Counters>,
}

impl CacheMetrics {
    pub fn new<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            counters: namespaces
                .into_iter()
                .map(|name| (name.into(), Counters::default()))
                .collect(),
        }
    }

    /// 이벤트를 기록합니다. 미등록 네임스페이스는 무시합니다.
    pub fn record(&self, namespace: &str, event: CacheEvent) {
        self.record_n(namespace, event, 1);
    }

    /// 같은 이벤트를 `n`회 기록합니다.
    pub fn record_n(&self, namespace: &str, event: CacheEvent, n: u64) {
        if n == 0 {
            return;
        }
        let Some(counters) = self.counters.get(namespace) else {
            return;
        };

        let target = match event {
            CacheEvent::L1Hit => &counters.l1_hits,
            CacheEvent::L2Hit => &counters.l2_hits,
            CacheEvent::Miss => &counters.misses,
            CacheEvent::Eviction => &counters.evictions,
            CacheEvent::Error => &counters.errors,
            CacheEvent::Write => &counters.writes,
        };
        target.fetch_add(n, Ordering::Relaxed);

        counter!(
            "report_cache_events_total",
            "namespace" => namespace.to_string(),
            "event" => event.label()
        )
        .increment(n);
    }

    /// 네임스페이스 스냅샷 (`size`는 0, 호출자가 채움).
    pub fn snapshot(&self, namespace: &str) -> Option<CacheStats> {
        self.counters.get(namespace).map(Counters::snapshot)
    }

    /// 모든 네임스페이스 스냅샷.
    pub fn snapshot_all(&self) -> BTreeMap<String, CacheStats> {
        self.counters
            .iter()
            .map(|(name, counters)| (name.clone(), counters.snapshot()))
            .collect()
    }

    /// 모든 카운터를 0으로 되돌립니다.
    pub fn reset(&self) {
        for counters in self.counters.values() {
            counters.reset();
        }
    }
}
