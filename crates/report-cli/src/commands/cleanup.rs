//! 보존 기간 정리 명령.

use anyhow::{Context, Result};
use report_cache::{CleanupReport, CleanupRequest, DurableStore, RetentionCleaner};
use report_core::{RetentionConfig, SystemClock};
use std::sync::Arc;
use tracing::info;

/// 명령줄 인자. 생략된 값은 `[retention]` 설정을 따릅니다.
#[derive(Debug, Clone, Default)]
pub struct CleanupArgs {
    pub prefixes: Vec<String>,
    pub retention_days: Option<i64>,
    pub limit: Option<usize>,
    pub execute: bool,
}

/// 인자와 설정으로 요청을 만듭니다. `--execute`가 없으면 항상 dry-run입니다.
pub fn build_request(args: &CleanupArgs, config: &RetentionConfig) -> Result<CleanupRequest> {
    let mut request = CleanupRequest::from_config(config);
    if !args.prefixes.is_empty() {
        request.prefixes = args.prefixes.clone();
    }
    if let Some(days) = args.retention_days {
        request.retention_days = days;
    }
    if let Some(limit) = args.limit {
        request.limit_per_prefix = limit;
    }
    if args.execute {
        request = request.execute();
    }

    request.validate().context("Invalid cleanup request")?;
    Ok(request)
}

/// 정리를 실행하고 결과를 돌려줍니다.
pub async fn run_cleanup(store: Arc<dyn DurableStore>, request: &CleanupRequest) -> Result<CleanupReport> {
    info!(
        prefixes = ?request.prefixes,
        retention_days = request.retention_days,
        dry_run = request.dry_run,
        "Running retention cleanup"
    );

    let cleaner = RetentionCleaner::new(store, Arc::new(SystemClock));
    let report = cleaner.run(request).await?;
    Ok(report)
}
