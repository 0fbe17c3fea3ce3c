//! 리포트 캐시 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 등록된 네임스페이스 보기
//! report-cache namespaces
//!
//! # Redis 연결 점검
//! report-cache ping
//!
//! # 14일 지난 분석 리포트 확인 (dry-run)
//! report-cache cleanup -p analysis_ -r 14
//!
//! # 실제 삭제
//! report-cache cleanup -p analysis_ -r 14 --execute
//!
//! # 캐시 항목 조회 / 무효화
//! report-cache get -n market_indicators -k VIX
//! report-cache invalidate -n money_flow --prefix KR:
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use report_cli::commands::cleanup::{build_request, run_cleanup, CleanupArgs};
use report_cli::commands::context::{build_registry, cache_manager, connect_store};
use report_cli::commands::inspect::{invalidate, lookup};
use report_cli::commands::namespaces::{format_json, format_table, namespace_rows};
use report_cache::DurableStore;
use report_core::{init_logging, AppConfig, LogConfig};
use serde::Serialize;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "report-cache")]
#[command(about = "Report cache CLI - 2단계 캐시 및 보존 기간 정리 도구", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일 경로
    #[arg(short, long, global = true, default_value = "config/default.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 등록된 네임스페이스와 TTL 정책 보기
    Namespaces {
        /// JSON으로 출력
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// L2(Redis) 연결 점검
    Ping,

    /// 보존 기간이 지난 날짜 키 정리 (기본 dry-run)
    Cleanup {
        /// 스캔할 키 접두사 (여러 번 지정 가능, 생략 시 설정값)
        #[arg(short, long = "prefix")]
        prefixes: Vec<String>,

        /// 보존 기간 (일)
        #[arg(short, long)]
        retention_days: Option<i64>,

        /// 접두사당 최대 스캔 키 수
        #[arg(short, long)]
        limit: Option<usize>,

        /// 실제로 삭제 (생략 시 dry-run)
        #[arg(long, default_value = "false")]
        execute: bool,
    },

    /// 캐시 항목 조회
    Get {
        /// 네임스페이스
        #[arg(short, long)]
        namespace: String,

        /// 키
        #[arg(short, long)]
        key: String,
    },

    /// 캐시 항목 무효화
    Invalidate {
        /// 네임스페이스
        #[arg(short, long)]
        namespace: String,

        /// 단일 키
        #[arg(short, long, conflicts_with = "prefix")]
        key: Option<String>,

        /// 접두사
        #[arg(short, long)]
        prefix: Option<String>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config))?;

    init_logging(LogConfig::from_settings(&config.logging))
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    match cli.command {
        Commands::Namespaces { json } => {
            let registry = build_registry(&config)?;
            let rows = namespace_rows(&registry);
            if json {
                println!("{}", format_json(&rows)?);
            } else {
                println!("{}", format_table(&rows));
            }
        }

        Commands::Ping => {
            let store = connect_store(&config).await?;
            match store.ping().await {
                Ok(true) => println!("✅ Redis 연결 정상: {}", config.redis.url),
                Ok(false) => {
                    println!("⚠️  Redis 응답 이상: {}", config.redis.url);
                    return Err(anyhow!("Unexpected PING reply"));
                }
                Err(e) => {
                    error!("Redis ping failed: {}", e);
                    return Err(e.into());
                }
            }
        }

        Commands::Cleanup {
            prefixes,
            retention_days,
            limit,
            execute,
        } => {
            let args = CleanupArgs {
                prefixes,
                retention_days,
                limit,
                execute,
            };
            let request = build_request(&args, &config.retention)?;

            if request.dry_run {
                println!("\n🔒 드라이런 모드: 키가 삭제되지 않습니다. (--execute로 실행)");
            }

            let store = connect_store(&config).await?;
            let report = run_cleanup(store, &request).await?;
            print_json(&report)?;

            if report.is_partial_failure() {
                error!(
                    failed = report.failed.len(),
                    "Cleanup finished with partial failures"
                );
            } else {
                info!("Cleanup finished");
            }
        }

        Commands::Get { namespace, key } => {
            let cache = cache_manager(&config).await?;
            print_json(&lookup(&cache, &namespace, &key).await?)?;
        }

        Commands::Invalidate {
            namespace,
            key,
            prefix,
        } => {
            let cache = cache_manager(&config).await?;
            print_json(&invalidate(&cache, &namespace, key, prefix).await?)?;
        }
    }

    Ok(())
}
