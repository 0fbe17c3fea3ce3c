//! 이름 있는 조회 전략.

use crate::error::{CacheError, Result};
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

type StrategyFn<T> = dyn Fn(String) -> BoxFuture<'static, Result<Option<T>>> + Send + Sync;

/// 폴백 체인의 한 단계.
///
/// 키를 받아 값을 돌려주는 비동기 함수에 이름을 붙인 것입니다.
/// `Ok(None)`은 "값 없음", `Err`는 상류 실패이며 둘 다 체인을 다음 단계로 넘깁니다.
pub struct FetchStrategy<T> {
    name: String,
    timeout: Option<Duration>,
    call: Arc<StrategyFn<T>>,
}

impl<T> FetchStrategy<T> {
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        T: Send + 'static,
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<T>>> + Send + 'static,
    {
        Self {
            name: name.into(),
            timeout: None,
            call: Arc::new(move |key| f(key).boxed()),
        }
    }

    /// 전략별 제한 시간. 초과하면 `Timeout` 오류로 기록됩니다.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) async fn invoke(&self, key: String) -> Result<Option<T>> {
        let call = (self.call)(key);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                CacheError::Timeout(format!("strategy '{}' exceeded {:?}", self.name, limit))
            })?,
            None => call.await,
        }
    }
}

impl<T> Clone for FetchStrategy<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            timeout: self.timeout,
            call: Arc::clone(&self.call),
        }
    }
}

impl<T> fmt::Debug for FetchStrategy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchStrategy")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
