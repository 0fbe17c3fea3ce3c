//! CLI 명령어 구현 모듈.

pub mod cleanup;
pub mod context;
pub mod inspect;
pub mod namespaces;
