//! 리포트 캐시 운영 CLI.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 네임스페이스 정책 조회
//! - Redis 연결 점검
//! - 캐시 항목 조회/무효화
//! - 보존 기간 정리 (기본 dry-run)

pub mod commands;
