//! 폴백 체인 조회기.
//!
//! 보조 지표 공급자(자금 흐름, 기사 풀, 시장 지표 등)를 우선순위대로 시도하고,
//! 모두 실패하면 중립 기본값을 돌려줍니다. 같은 키에 대한 동시 요청은
//! 하나의 실행으로 합쳐집니다.
//!
//! ```text
//! fetch(key) ──▶ in-flight 맵 조회/등록 (단일 임계 구역)
//!                  │ 없음                     │ 있음
//!                  ▼                          ▼
//!            spawn(chain.run) ──────▶ Shared 결과 대기
//!                  │
//!          cache → S1 → S2 → ... → default
//! ```
//!
//! 체인은 별도 태스크에서 실행되므로 한 호출자가 취소되거나 시간 초과되어도
//! 다른 대기자의 결과에는 영향이 없습니다.

pub mod chain;
pub mod strategy;

pub use chain::{
    AttemptOutcome, FallbackAttemptRecord, FallbackChain, FetchOutcome, CACHE_SOURCE,
    DEFAULT_SOURCE,
};
pub use strategy::FetchStrategy;

use crate::cache::CacheManager;
use crate::error::{CacheError, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, error, instrument, Instrument};

type SharedFetch<T> = Shared<BoxFuture<'static, Arc<FetchOutcome<T>>>>;
type InFlight<T> = Arc<Mutex<HashMap<String, SharedFetch<T>>>>;

/// 중복 제거 폴백 조회기.
pub struct FallbackFetcher<T> {
    cache: Arc<CacheManager>,
    chain: Arc<FallbackChain<T>>,
    in_flight: InFlight<T>,
}

impl<T> Clone for FallbackFetcher<T> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            chain: Arc::clone(&self.chain),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<T> FallbackFetcher<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// 체인의 캐시 네임스페이스가 등록되어 있지 않으면 `Configuration` 오류.
    pub fn new(cache: Arc<CacheManager>, chain: FallbackChain<T>) -> Result<Self> {
        cache.registry().resolve(chain.namespace())?;
        Ok(Self {
            cache,
            chain: Arc::new(chain),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn chain(&self) -> &FallbackChain<T> {
        &self.chain
    }

    /// 값을 조회합니다. 항상 값을 반환하며, 실패 시 중립 기본값입니다.
    #[instrument(skip(self), fields(domain = %self.chain.domain()))]
    pub async fn fetch(&self, key: &str) -> FetchOutcome<T> {
        let outcome = self.join_or_start(key).await;
        (*outcome).clone()
    }

    /// 호출자 단위 제한 시간을 둔 조회. 시간 초과는 이 호출자에게만 적용되고
    /// 진행 중인 실행은 계속됩니다.
    pub async fn fetch_with_timeout(&self, key: &str, limit: Duration) -> Result<FetchOutcome<T>> {
        tokio::time::timeout(limit, self.fetch(key))
            .await
            .map_err(|_| {
                CacheError::Timeout(format!(
                    "fetch {}:{} exceeded {:?}",
                    self.chain.domain(),
                    key,
                    limit
                ))
            })
    }

    /// 현재 진행 중인 키 수.
    pub fn in_flight_count(&self) -> usize {
        lock_in_flight(&self.in_flight).len()
    }

    fn join_or_start(&self, key: &str) -> SharedFetch<T> {
        let mut in_flight = lock_in_flight(&self.in_flight);
        if let Some(existing) = in_flight.get(key) {
            debug!(key, "Joining in-flight fetch");
            return existing.clone();
        }

        let cache = Arc::clone(&self.cache);
        let chain = Arc::clone(&self.chain);
        let guard = InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            key: key.to_string(),
        };
        let span = report_core::cache_span!("fallback_fetch", chain.namespace(), key);
        let task = tokio::spawn(
            async move {
                let outcome = chain.run(&cache, &guard.key).await;
                drop(guard);
                Arc::new(outcome)
            }
            .instrument(span),
        );

        let chain = Arc::clone(&self.chain);
        let shared = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(error = %e, "Fallback task aborted, returning neutral default");
                    Arc::new(chain.neutral_outcome(Vec::new()))
                }
            }
        }
        .boxed()
        .shared();

        in_flight.insert(key.to_string(), shared.clone());
        shared
    }
}

/// 실행 태스크가 끝나거나 패닉하면 자신의 in-flight 항목을 지웁니다.
struct InFlightGuard<T> {
    in_flight: InFlight<T>,
    key: String,
}

impl<T> Drop for InFlightGuard<T> {
    fn drop(&mut self) {
        lock_in_flight(&self.in_flight).remove(&self.key);
    }
}

fn lock_in_flight<T>(
    in_flight: &Mutex<HashMap<String, SharedFetch<T>>>,
) -> MutexGuard<'_, HashMap<String, SharedFetch<T>>> {
    match in_flight.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            error!("In-flight map mutex poisoned, recovering");
            poisoned.into_inner()
        }
    }
}
