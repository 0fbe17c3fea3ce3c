//! 네임스페이스 정책 타입.
//!
//! 네임스페이스는 하나의 TTL/용량 정책을 공유하는 키 그룹입니다.
//! 각 네임스페이스는 네 가지 전략 밴드 중 하나에 속하며, 밴드가
//! L1:L2 TTL 비율을 고정하므로 네임스페이스별 튜닝은 크기만 조정합니다.
//!
//! | 밴드 | 기본 L2 TTL | L2/L1 비율 | 기본 L1 용량 |
//! |------|------------|-----------|-------------|
//! | real_time | 60초 | 6 | 500 |
//! | interactive | 5분 | 10 | 1000 |
//! | batch | 1시간 | 60 | 100 |
//! | reference | 1일 | 60 | 200 |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// 네임스페이스 정의 오류.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamespaceError {
    #[error("namespace name must not be empty")]
    EmptyName,

    #[error("namespace '{0}' has an empty key prefix")]
    EmptyPrefix(String),

    #[error("namespace '{name}' has an invalid TTL: {reason}")]
    InvalidTtl { name: String, reason: String },

    #[error("namespace '{0}' must allow at least one L1 entry")]
    ZeroCapacity(String),

    #[error("namespace '{0}' has an empty version tag")]
    EmptyVersion(String),

    #[error("unknown strategy band: {0}")]
    UnknownBand(String),
}

/// 캐시 전략 밴드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyBand {
    /// 초 단위 TTL (호가, 자금 흐름 신호)
    RealTime,
    /// 수십 초 ~ 수 분 (대화형 조회)
    Interactive,
    /// 시간 단위 (배치 분석 결과)
    Batch,
    /// 하루 이상 (참조 데이터)
    Reference,
}

impl StrategyBand {
    /// 모든 밴드.
    pub const ALL: [StrategyBand; 4] = [
        StrategyBand::RealTime,
        StrategyBand::Interactive,
        StrategyBand::Batch,
        StrategyBand::Reference,
    ];

    /// L2 TTL을 L1 TTL로 나누는 고정 비율.
    pub fn ttl_ratio(&self) -> u32 {
        match self {
            Self::RealTime => 6,
            Self::Interactive => 10,
            Self::Batch => 60,
            Self::Reference => 60,
        }
    }

    /// 밴드 기본 L2 TTL.
    pub fn default_l2_ttl(&self) -> Duration {
        match self {
            Self::RealTime => Duration::from_secs(60),
            Self::Interactive => Duration::from_secs(300),
            Self::Batch => Duration::from_secs(3600),
            Self::Reference => Duration::from_secs(86_400),
        }
    }

    /// 밴드 기본 L1 용량.
    pub fn default_l1_max_entries(&self) -> usize {
        match self {
            Self::RealTime => 500,
            Self::Interactive => 1000,
            Self::Batch => 100,
            Self::Reference => 200,
        }
    }

    /// 주어진 L2 TTL에 대응하는 L1 TTL.
    pub fn l1_ttl_for(&self, l2_ttl: Duration) -> Duration {
        l2_ttl / self.ttl_ratio()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RealTime => "real_time",
            Self::Interactive => "interactive",
            Self::Batch => "batch",
            Self::Reference => "reference",
        }
    }
}

impl fmt::Display for StrategyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyBand {
    type Err = NamespaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "real_time" | "realtime" => Ok(Self::RealTime),
            "interactive" => Ok(Self::Interactive),
            "batch" => Ok(Self::Batch),
            "reference" => Ok(Self::Reference),
            _ => Err(NamespaceError::UnknownBand(s.to_string())),
        }
    }
}

/// 네임스페이스 디스크립터.
///
/// 등록 후에는 프로세스 수명 동안 변경되지 않습니다. 필드는 빌더를 통해서만
/// 채워지므로 `l1_ttl = l2_ttl / band.ttl_ratio()` 관계가 항상 유지됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDescriptor {
    name: String,
    key_prefix: String,
    l1_ttl: Duration,
    l1_max_entries: usize,
    l2_ttl: Duration,
    strategy_band: StrategyBand,
    version_tag: String,
}

impl NamespaceDescriptor {
    /// 빌더를 생성합니다.
    pub fn builder(name: impl Into<String>, band: StrategyBand) -> NamespaceDescriptorBuilder {
        NamespaceDescriptorBuilder::new(name, band)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// L2 키 접두사. 전체 키는 `key_prefix + key`.
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn l1_ttl(&self) -> Duration {
        self.l1_ttl
    }

    pub fn l1_max_entries(&self) -> usize {
        self.l1_max_entries
    }

    pub fn l2_ttl(&self) -> Duration {
        self.l2_ttl
    }

    pub fn strategy_band(&self) -> StrategyBand {
        self.strategy_band
    }

    pub fn version_tag(&self) -> &str {
        &self.version_tag
    }

    /// L2 저장용 전체 키.
    pub fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// 디스크립터의 내부 일관성을 검증합니다.
    pub fn validate(&self) -> Result<(), NamespaceError> {
        if self.name.trim().is_empty() {
            return Err(NamespaceError::EmptyName);
        }
        if self.key_prefix.is_empty() {
            return Err(NamespaceError::EmptyPrefix(self.name.clone()));
        }
        if self.version_tag.trim().is_empty() {
            return Err(NamespaceError::EmptyVersion(self.name.clone()));
        }
        if self.l1_max_entries == 0 {
            return Err(NamespaceError::ZeroCapacity(self.name.clone()));
        }
        if self.l1_ttl.is_zero() {
            return Err(NamespaceError::InvalidTtl {
                name: self.name.clone(),
                reason: format!(
                    "L2 TTL {:?} is too short for band {} (ratio {})",
                    self.l2_ttl,
                    self.strategy_band,
                    self.strategy_band.ttl_ratio()
                ),
            });
        }
        if self.strategy_band.l1_ttl_for(self.l2_ttl) != self.l1_ttl {
            return Err(NamespaceError::InvalidTtl {
                name: self.name.clone(),
                reason: "L1 TTL does not follow the band ratio".to_string(),
            });
        }
        Ok(())
    }
}

/// [`NamespaceDescriptor`] 빌더.
#[derive(Debug, Clone)]
pub struct NamespaceDescriptorBuilder {
    name: String,
    band: StrategyBand,
    key_prefix: Option<String>,
    l2_ttl: Option<Duration>,
    l1_max_entries: Option<usize>,
    version_tag: String,
}

impl NamespaceDescriptorBuilder {
    fn new(name: impl Into<String>, band: StrategyBand) -> Self {
        Self {
            name: name.into(),
            band,
            key_prefix: None,
            l2_ttl: None,
            l1_max_entries: None,
            version_tag: "v1".to_string(),
        }
    }

    /// 키 접두사 (기본값: `"{name}:"`).
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// L2 TTL. L1 TTL은 밴드 비율로 계산됩니다.
    pub fn l2_ttl(mut self, ttl: Duration) -> Self {
        self.l2_ttl = Some(ttl);
        self
    }

    pub fn l1_max_entries(mut self, max: usize) -> Self {
        self.l1_max_entries = Some(max);
        self
    }

    pub fn version(mut self, tag: impl Into<String>) -> Self {
        self.version_tag = tag.into();
        self
    }

    /// 디스크립터를 만들고 검증합니다.
    pub fn build(self) -> Result<NamespaceDescriptor, NamespaceError> {
        let l2_ttl = self.l2_ttl.unwrap_or_else(|| self.band.default_l2_ttl());
        let descriptor = NamespaceDescriptor {
            key_prefix: self
                .key_prefix
                .unwrap_or_else(|| format!("{}:", self.name)),
            l1_ttl: self.band.l1_ttl_for(l2_ttl),
            l1_max_entries: self
                .l1_max_entries
                .unwrap_or_else(|| self.band.default_l1_max_entries()),
            l2_ttl,
            strategy_band: self.band,
            version_tag: self.version_tag,
            name: self.name,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_band_ratio() {
        let ns = NamespaceDescriptor::builder("sentiment_analysis", StrategyBand::Batch)
            .l2_ttl(Duration::from_secs(3600))
            .l1_max_entries(100)
            .build()
            .unwrap();

        assert_eq!(ns.l1_ttl(), Duration::from_secs(60));
        assert_eq!(ns.l2_ttl(), Duration::from_secs(3600));
        assert_eq!(ns.key_prefix(), "sentiment_analysis:");
        assert_eq!(ns.full_key("AAPL"), "sentiment_analysis:AAPL");
    }

    #[test]
    fn test_band_defaults_are_consistent() {
        for band in StrategyBand::ALL {
            let ns = NamespaceDescriptor::builder(format!("ns_{}", band), band)
                .build()
                .unwrap();
            assert_eq!(ns.l1_ttl() * band.ttl_ratio(), ns.l2_ttl());
            assert!(ns.l1_ttl() < ns.l2_ttl());
        }
    }

    #[test]
    fn test_too_short_ttl_rejected() {
        let err = NamespaceDescriptor::builder("ticks", StrategyBand::Batch)
            .l2_ttl(Duration::from_secs(30))
            .build()
            .unwrap_err();
        assert!(matches!(err, NamespaceError::InvalidTtl { .. }));
    }

    #[test]
    fn test_invalid_fields_rejected() {
        assert_eq!(
            NamespaceDescriptor::builder("", StrategyBand::Batch)
                .build()
                .unwrap_err(),
            NamespaceError::EmptyName
        );
        assert!(matches!(
            NamespaceDescriptor::builder("a", StrategyBand::Batch)
                .key_prefix("")
                .build(),
            Err(NamespaceError::EmptyPrefix(_))
        ));
        assert!(matches!(
            NamespaceDescriptor::builder("a", StrategyBand::Batch)
                .l1_max_entries(0)
                .build(),
            Err(NamespaceError::ZeroCapacity(_))
        ));
        assert!(matches!(
            NamespaceDescriptor::builder("a", StrategyBand::Batch)
                .version(" ")
                .build(),
            Err(NamespaceError::EmptyVersion(_))
        ));
    }

    #[test]
    fn test_band_from_str() {
        assert_eq!("real-time".parse::<StrategyBand>().unwrap(), StrategyBand::RealTime);
        assert_eq!("BATCH".parse::<StrategyBand>().unwrap(), StrategyBand::Batch);
        assert!("hourly".parse::<StrategyBand>().is_err());
    }
}
