//! 캐시 모듈 오류 타입.

use report_core::NamespaceError;
use thiserror::Error;

/// 캐시 계층 오류.
///
/// `get`/`set` 호출자에게 실제로 전달되는 것은 `Configuration`과
/// `Serialization`(값 인코딩 실패)뿐입니다. 나머지는 내부에서 복구되어
/// 카운터와 로그로만 남습니다.
#[derive(Debug, Error)]
pub enum CacheError {
    /// 미등록/충돌 네임스페이스
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// L2 읽기/쓰기 실패
    #[error("Storage tier error: {0}")]
    StorageTier(String),

    /// 직렬화/역직렬화 오류
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 폴백 전략 실패
    #[error("Upstream provider error: {0}")]
    UpstreamProvider(String),

    /// 모든 폴백 전략 소진
    #[error("All strategies exhausted for {domain}:{key}")]
    Exhausted { domain: String, key: String },

    /// 타임아웃 오류
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// 잘못된 관리 요청
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CacheError {
    /// 호출 지점에서 치명적으로 다뤄야 하는 오류인지 확인합니다.
    pub fn is_configuration(&self) -> bool {
        matches!(self, CacheError::Configuration(_))
    }
}

impl From<NamespaceError> for CacheError {
    fn from(err: NamespaceError) -> Self {
        CacheError::Configuration(err.to_string())
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::StorageTier(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
