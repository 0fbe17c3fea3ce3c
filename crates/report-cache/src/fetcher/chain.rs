//! 폴백 체인 정의와 순차 실행.

use super::strategy::FetchStrategy;
use crate::cache::CacheManager;
use crate::error::CacheError;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// 캐시 조회 단계의 이름.
pub const CACHE_SOURCE: &str = "cache";
/// 중립 기본값이 반환되었을 때의 출처.
pub const DEFAULT_SOURCE: &str = "default";

/// 한 단계의 결과.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    Hit,
    Miss,
    /// 값은 있었지만 검증 실패
    Invalid,
    Error(String),
}

/// 단계별 시도 기록.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackAttemptRecord {
    pub strategy_name: String,
    pub outcome: AttemptOutcome,
}

impl FallbackAttemptRecord {
    fn new(strategy_name: &str, outcome: AttemptOutcome) -> Self {
        Self {
            strategy_name: strategy_name.to_string(),
            outcome,
        }
    }
}

/// 폴백 조회 결과.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchOutcome<T> {
    pub value: T,
    /// 값을 제공한 전략 이름, `cache:L1`/`cache:L2`, 또는 `default`
    pub source: String,
    pub cached: bool,
    pub attempts: Vec<FallbackAttemptRecord>,
}

impl<T> FetchOutcome<T> {
    /// 모든 단계가 실패해 기본값이 반환되었는지.
    pub fn is_default(&self) -> bool {
        self.source == DEFAULT_SOURCE
    }
}

type Validator<T> = dyn Fn(&T) -> bool + Send + Sync;

/// 데이터 도메인 하나의 폴백 체인.
///
/// 전략은 추가한 순서대로만 시도됩니다.
pub struct FallbackChain<T> {
    domain: String,
    namespace: String,
    strategies: Vec<FetchStrategy<T>>,
    default: T,
    validator: Option<Arc<Validator<T>>>,
}

impl<T> FallbackChain<T> {
    /// `namespace`는 성공한 값을 캐싱할 네임스페이스입니다.
    pub fn new(domain: impl Into<String>, namespace: impl Into<String>, default: T) -> Self {
        Self {
            domain: domain.into(),
            namespace: namespace.into(),
            strategies: Vec::new(),
            default,
            validator: None,
        }
    }

    /// 다음 우선순위의 전략을 추가합니다.
    pub fn strategy(mut self, strategy: FetchStrategy<T>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// 구조 검증 함수. false를 반환한 값은 없는 것으로 취급됩니다.
    pub fn validator(mut self, validator: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(FetchStrategy::name).collect()
    }

    fn is_valid(&self, value: &T) -> bool {
        self.validator.as_ref().map_or(true, |validate| validate(value))
    }
}

impl<T: Clone> FallbackChain<T> {
    pub(crate) fn neutral_outcome(&self, attempts: Vec<FallbackAttemptRecord>) -> FetchOutcome<T> {
        FetchOutcome {
            value: self.default.clone(),
            source: DEFAULT_SOURCE.to_string(),
            cached: false,
            attempts,
        }
    }
}

impl<T> FallbackChain<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// 캐시, 전략 순으로 시도합니다. 실패는 반환하지 않습니다.
    pub(crate) async fn run(&self, cache: &CacheManager, key: &str) -> FetchOutcome<T> {
        let mut attempts = Vec::with_capacity(self.strategies.len() + 1);

        match cache.get::<T>(&self.namespace, key).await {
            Ok(Some(hit)) if self.is_valid(&hit.value) => {
                attempts.push(FallbackAttemptRecord::new(CACHE_SOURCE, AttemptOutcome::Hit));
                debug!(tier = %hit.tier, "Served from cache");
                return FetchOutcome {
                    value: hit.value,
                    source: format!("{}:{}", CACHE_SOURCE, hit.tier),
                    cached: true,
                    attempts,
                };
            }
            Ok(Some(_)) => {
                attempts.push(FallbackAttemptRecord::new(CACHE_SOURCE, AttemptOutcome::Invalid))
            }
            Ok(None) => {
                attempts.push(FallbackAttemptRecord::new(CACHE_SOURCE, AttemptOutcome::Miss))
            }
            Err(e) => attempts.push(FallbackAttemptRecord::new(
                CACHE_SOURCE,
                AttemptOutcome::Error(e.to_string()),
            )),
        }

        for strategy in &self.strategies {
            let outcome = match strategy.invoke(key.to_string()).await {
                Ok(Some(value)) if self.is_valid(&value) => {
                    attempts.push(FallbackAttemptRecord::new(strategy.name(), AttemptOutcome::Hit));
                    if let Err(e) = cache.set(&self.namespace, key, &value, None).await {
                        warn!(strategy = strategy.name(), error = %e, "Failed to cache fetched value");
                    }
                    debug!(strategy = strategy.name(), attempts = ?attempts, "Fallback chain resolved");
                    return FetchOutcome {
                        value,
                        source: strategy.name().to_string(),
                        cached: false,
                        attempts,
                    };
                }
                Ok(Some(_)) => {
                    debug!(strategy = strategy.name(), "Strategy returned invalid value");
                    AttemptOutcome::Invalid
                }
                Ok(None) => AttemptOutcome::Miss,
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, "Strategy failed");
                    AttemptOutcome::Error(e.to_string())
                }
            };
            attempts.push(FallbackAttemptRecord::new(strategy.name(), outcome));
        }

        let exhausted = CacheError::Exhausted {
            domain: self.domain.clone(),
            key: key.to_string(),
        };
        warn!(attempts = ?attempts, "{}, returning neutral default", exhausted);
        self.neutral_outcome(attempts)
    }
}

impl<T> fmt::Debug for FallbackChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackChain")
            .field("domain", &self.domain)
            .field("namespace", &self.namespace)
            .field("strategies", &self.strategy_names())
            .finish_non_exhaustive()
    }
}
