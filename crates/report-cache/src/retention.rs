//! 보존 기간 정리 서비스.
//!
//! 내구성 저장소에서 날짜가 포함된 키를 찾아 보존 기간이 지난 것을 지웁니다.
//! 기본은 dry-run이며 실행 여부(운영자 승인)는 호출자가 결정합니다.
//!
//! # 키 날짜 규칙
//!
//! | 형태 | 예 |
//! |------|----|
//! | 끝에 붙은 ISO 날짜 | `analysis_2025-01-01`, `report2025-01-01` |
//! | 밑줄 사이의 ISO 날짜 | `analysis_2025-01-01_AAPL` |
//!
//! 두 규칙이 모두 맞으면 끝 날짜가 우선하고, 밑줄 사이 날짜가 여러 개면
//! 마지막 것을 씁니다. 날짜를 읽을 수 없는 키는 절대 삭제 후보가 되지 않습니다.

use crate::error::{CacheError, Result};
use crate::storage::DurableStore;
use chrono::NaiveDate;
use report_core::{Clock, RetentionConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const ISO_DATE_LEN: usize = 10;

// =============================================================================
// 요청 / 결과
// =============================================================================

fn default_dry_run() -> bool {
    true
}

fn default_limit_per_prefix() -> usize {
    1000
}

fn default_sample_limit() -> usize {
    20
}

/// 정리 요청.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupRequest {
    pub prefixes: Vec<String>,
    pub retention_days: i64,
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
    /// 접두사당 최대 스캔 키 수
    #[serde(default = "default_limit_per_prefix")]
    pub limit_per_prefix: usize,
    /// 결과에 포함할 후보 샘플 수
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,
}

impl CleanupRequest {
    /// dry-run 요청을 생성합니다.
    pub fn new<I, S>(prefixes: I, retention_days: i64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            retention_days,
            dry_run: default_dry_run(),
            limit_per_prefix: default_limit_per_prefix(),
            sample_limit: default_sample_limit(),
        }
    }

    /// 설정 파일의 `[retention]` 섹션으로부터 dry-run 요청을 만듭니다.
    pub fn from_config(config: &RetentionConfig) -> Self {
        Self {
            prefixes: config.prefixes.clone(),
            retention_days: config.retention_days,
            dry_run: true,
            limit_per_prefix: config.limit_per_prefix,
            sample_limit: config.sample_limit,
        }
    }

    /// 실제 삭제를 수행하도록 전환합니다.
    pub fn execute(mut self) -> Self {
        self.dry_run = false;
        self
    }

    pub fn with_limit(mut self, limit_per_prefix: usize) -> Self {
        self.limit_per_prefix = limit_per_prefix;
        self
    }

    pub fn with_sample_limit(mut self, sample_limit: usize) -> Self {
        self.sample_limit = sample_limit;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.prefixes.is_empty() {
            return Err(CacheError::InvalidRequest(
                "at least one prefix is required".to_string(),
            ));
        }
        // 빈 접두사는 저장소 전체와 일치
        if self.prefixes.iter().any(|p| p.is_empty()) {
            return Err(CacheError::InvalidRequest(
                "empty prefix is not allowed".to_string(),
            ));
        }
        if self.retention_days < 0 {
            return Err(CacheError::InvalidRequest(format!(
                "retention_days must not be negative: {}",
                self.retention_days
            )));
        }
        if self.limit_per_prefix == 0 {
            return Err(CacheError::InvalidRequest(
                "limit_per_prefix must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// 삭제 후보.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetentionCandidate {
    pub key: String,
    pub parsed_date: NaiveDate,
    pub age_days: i64,
}

/// 개별 키 삭제 실패.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDeletion {
    pub key: String,
    pub error: String,
}

/// 접두사별 요약.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrefixSummary {
    pub prefix: String,
    pub scanned: usize,
    pub candidates: usize,
    /// 스캔 실패 시 오류 메시지
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 정리 결과.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub dry_run: bool,
    pub scanned: usize,
    pub candidates: usize,
    /// dry-run이면 None
    pub deleted: Option<usize>,
    pub failed: Vec<FailedDeletion>,
    pub samples: Vec<RetentionCandidate>,
    pub prefixes: Vec<PrefixSummary>,
}

impl CleanupReport {
    /// 일부 키 삭제가 실패했는지.
    pub fn is_partial_failure(&self) -> bool {
        !self.failed.is_empty() || self.prefixes.iter().any(|p| p.error.is_some())
    }
}

// =============================================================================
// 날짜 파싱
// =============================================================================

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let bytes = s.as_bytes();
    if bytes.len() != ISO_DATE_LEN {
        return None;
    }
    let shape_ok = bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// 키에 포함된 날짜를 찾습니다. 규칙은 모듈 문서 참고.
pub fn parse_key_date(key: &str) -> Option<NaiveDate> {
    trailing_date(key).or_else(|| embedded_date(key))
}

fn trailing_date(key: &str) -> Option<NaiveDate> {
    let start = key.len().checked_sub(ISO_DATE_LEN)?;
    let tail = key.get(start..)?;
    let preceded_by_digit = key[..start]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_ascii_digit());
    if preceded_by_digit {
        return None;
    }
    parse_iso_date(tail)
}

fn embedded_date(key: &str) -> Option<NaiveDate> {
    let segments: Vec<&str> = key.split('_').collect();
    if segments.len() < 3 {
        return None;
    }
    segments[1..segments.len() - 1]
        .iter()
        .rev()
        .find_map(|segment| parse_iso_date(segment))
}

/// 보존 기간을 넘긴 키면 후보를 반환합니다.
pub fn evaluate_key(key: &str, today: NaiveDate, retention_days: i64) -> Option<RetentionCandidate> {
    let parsed_date = parse_key_date(key)?;
    let age_days = (today - parsed_date).num_days();
    (age_days > retention_days).then(|| RetentionCandidate {
        key: key.to_string(),
        parsed_date,
        age_days,
    })
}

// =============================================================================
// 정리 서비스
// =============================================================================

/// 보존 기간 정리 서비스.
pub struct RetentionCleaner {
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
}

impl RetentionCleaner {
    pub fn new(store: Arc<dyn DurableStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// 정리를 실행합니다.
    ///
    /// 요청 검증 실패만 오류로 반환합니다. 접두사 스캔 실패와 개별 키 삭제
    /// 실패는 결과에 기록되고 나머지 작업은 계속됩니다.
    #[instrument(skip(self, request), fields(
        dry_run = request.dry_run,
        retention_days = request.retention_days
    ))]
    pub async fn run(&self, request: &CleanupRequest) -> Result<CleanupReport> {
        request.validate()?;
        let today = self.clock.now().date_naive();

        let mut summaries = Vec::with_capacity(request.prefixes.len());
        let mut candidates: Vec<RetentionCandidate> = Vec::new();
        let mut seen = HashSet::new();
        let mut scanned = 0;

        for prefix in &request.prefixes {
            let mut summary = PrefixSummary {
                prefix: prefix.clone(),
                scanned: 0,
                candidates: 0,
                error: None,
            };

            match self
                .store
                .scan_prefix(prefix, Some(request.limit_per_prefix))
                .await
            {
                Ok(keys) => {
                    summary.scanned = keys.len();
                    for key in keys {
                        let Some(candidate) = evaluate_key(&key, today, request.retention_days)
                        else {
                            continue;
                        };
                        summary.candidates += 1;
                        if seen.insert(candidate.key.clone()) {
                            candidates.push(candidate);
                        }
                    }
                }
                Err(e) => {
                    warn!(prefix = %prefix, error = %e, "Prefix scan failed");
                    summary.error = Some(e.to_string());
                }
            }

            debug!(
                prefix = %prefix,
                scanned = summary.scanned,
                candidates = summary.candidates,
                "Prefix scanned"
            );
            scanned += summary.scanned;
            summaries.push(summary);
        }

        let mut report = CleanupReport {
            dry_run: request.dry_run,
            scanned,
            candidates: candidates.len(),
            deleted: None,
            failed: Vec::new(),
            samples: candidates
                .iter()
                .take(request.sample_limit)
                .cloned()
                .collect(),
            prefixes: summaries,
        };

        if !request.dry_run {
            let mut deleted = 0;
            for candidate in &candidates {
                match self.store.delete(&candidate.key).await {
                    Ok(true) => deleted += 1,
                    Ok(false) => debug!(key = %candidate.key, "Key already gone"),
                    Err(e) => {
                        warn!(key = %candidate.key, error = %e, "Failed to delete expired key");
                        report.failed.push(FailedDeletion {
                            key: candidate.key.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }
            report.deleted = Some(deleted);
        }

        info!(
            scanned = report.scanned,
            candidates = report.candidates,
            deleted = ?report.deleted,
            failed = report.failed.len(),
            "Retention cleanup finished"
        );
        Ok(report)
    }
}
