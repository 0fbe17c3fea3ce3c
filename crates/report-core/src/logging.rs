//! tracing을 사용한 로깅 인프라.
//!
//! 출력 형식:
//! - **pretty**: 개발용 사람이 읽기 쉬운 형식
//! - **json**: 운영환경/로그 집계용 JSON 형식
//! - **compact**: 로그 크기를 줄이기 위한 간결한 형식

use crate::config::LoggingConfig;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 로그 레벨 필터 (예: "info", "report_cache=debug")
    pub level: String,
    pub format: LogFormat,
    /// span 진입/종료 이벤트 포함 여부
    pub with_span_events: bool,
    /// 파일명과 줄 번호 포함 여부
    pub with_file: bool,
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            with_span_events: false,
            with_file: false,
            with_target: true,
        }
    }
}

impl LogConfig {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.with_span_events = enabled;
        self
    }

    /// `[logging]` 설정 섹션에서 생성합니다. 알 수 없는 형식은 pretty로 처리합니다.
    pub fn from_settings(settings: &LoggingConfig) -> Self {
        Self {
            level: settings.level.clone(),
            format: settings.format.parse().unwrap_or_default(),
            ..Default::default()
        }
    }

    /// `RUST_LOG`, `LOG_FORMAT` 환경 변수에서 생성합니다.
    pub fn from_env() -> Self {
        let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let format = std::env::var("LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        Self {
            level,
            format,
            ..Default::default()
        }
    }

    fn span_events(&self) -> FmtSpan {
        if self.with_span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// 주어진 설정으로 로깅 시스템을 초기화합니다.
///
/// `RUST_LOG`가 설정되어 있으면 `config.level`보다 우선합니다.
///
/// ```no_run
/// use report_core::logging::{init_logging, LogConfig, LogFormat};
///
/// init_logging(LogConfig::new("report_cache=debug").with_format(LogFormat::Json)).unwrap();
/// ```
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_file(config.with_file)
            .with_line_number(config.with_file)
            .with_target(config.with_target)
            .with_span_events(config.span_events())
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_file(config.with_file)
            .with_line_number(config.with_file)
            .with_target(config.with_target)
            .with_span_events(config.span_events())
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_file(config.with_file)
            .with_line_number(config.with_file)
            .with_target(config.with_target)
            .with_span_events(config.span_events())
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()?;

    tracing::info!(
        format = ?config.format,
        level = %config.level,
        "Logging initialized"
    );

    Ok(())
}

/// 환경 변수에서 로깅을 초기화합니다.
pub fn init_logging_from_env() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LogConfig::from_env())
}

/// 네임스페이스/키 필드가 포함된 span을 생성하는 매크로.
#[macro_export]
macro_rules! cache_span {
    ($name:expr, $namespace:expr) => {
        tracing::debug_span!($name, namespace = %$namespace)
    };
    ($name:expr, $namespace:expr, $key:expr) => {
        tracing::debug_span!($name, namespace = %$namespace, key = %$key)
    };
}
