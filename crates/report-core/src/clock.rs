//! 시계 추상화.
//!
//! TTL 만료와 보존 기간 계산은 모두 [`Clock`]을 통해 현재 시각을 얻습니다.
//! 운영 환경에서는 [`SystemClock`], 테스트에서는 [`ManualClock`]을 주입합니다.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, RwLock};

/// 현재 시각 제공자.
pub trait Clock: Send + Sync {
    /// 현재 UTC 시각.
    fn now(&self) -> DateTime<Utc>;
}

/// 벽시계 기반 시계.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 수동으로 조작하는 시계 (테스트용).
///
/// 복제본은 같은 시각을 공유하므로, 캐시 매니저에 넘긴 뒤에도
/// 테스트 쪽에서 `advance`로 시간을 흘려보낼 수 있습니다.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    /// 주어진 시각에서 시작하는 시계를 생성합니다.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    /// 현재 벽시계 시각에서 시작합니다.
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    /// 시간을 앞으로 이동합니다.
    pub fn advance(&self, by: Duration) {
        let mut now = match self.now.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *now += by;
    }

    /// 초 단위로 시간을 이동합니다.
    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }

    /// 시각을 직접 지정합니다.
    pub fn set(&self, at: DateTime<Utc>) {
        let mut now = match self.now.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *now = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
