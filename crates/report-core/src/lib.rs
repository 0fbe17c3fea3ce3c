//! # Report Core
//!
//! 리포트 캐시 계층 전반에서 공유되는 기본 타입을 제공합니다.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 설정 관리 (`AppConfig`)
//! - 로깅 인프라
//! - 테스트 가능한 시계 추상화
//! - 네임스페이스 정책 타입 (전략 밴드, 디스크립터)

pub mod clock;
pub mod config;
pub mod logging;
pub mod namespace;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::*;
pub use logging::*;
pub use namespace::{NamespaceDescriptor, NamespaceDescriptorBuilder, NamespaceError, StrategyBand};
