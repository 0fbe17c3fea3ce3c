//! 캐시 항목과 조회 결과 타입.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// 하나의 티어가 소유하는 캐시 항목.
///
/// L2에는 `CacheEntry<serde_json::Value>`가 JSON으로 저장되어, 저장소의
/// 자체 만료 기능과 무관하게 읽을 때마다 만료를 확인할 수 있습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub key: String,
    pub value: T,
    pub inserted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub namespace: String,
}

impl<T> CacheEntry<T> {
    /// `now + ttl`에 만료되는 항목을 생성합니다.
    pub fn new(
        namespace: impl Into<String>,
        key: impl Into<String>,
        value: T,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            key: key.into(),
            value,
            inserted_at: now,
            expires_at: expiry_after(now, ttl),
            namespace: namespace.into(),
        }
    }

    /// 만료 시각이 지났는지 확인합니다. 만료 시각과 같은 순간부터 만료로 봅니다.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// 남은 수명. 이미 만료되었으면 0.
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// 절대 만료 시각 계산. 표현 범위를 넘는 TTL은 최대 시각으로 고정합니다.
pub(crate) fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// 값을 제공한 티어.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheTier {
    L1,
    L2,
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::L1 => write!(f, "L1"),
            Self::L2 => write!(f, "L2"),
        }
    }
}

/// 캐시 적중 결과.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit<T> {
    pub value: T,
    pub tier: CacheTier,
}

/// 무효화 대상.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    /// 단일 키
    Key(String),
    /// 접두사가 일치하는 모든 키
    Prefix(String),
}

impl Invalidation {
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::Prefix(prefix.into())
    }
}
