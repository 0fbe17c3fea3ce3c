//! 네임스페이스 레지스트리.
//!
//! 논리 데이터 도메인을 티어 정책에 매핑합니다. 레지스트리는 가변으로
//! 구성한 뒤 캐시 매니저에 `Arc`로 넘겨 고정되며, 이후 변경되지 않습니다.
//!
//! 미등록 네임스페이스 조회는 즉시 실패합니다. 기본 TTL로 조용히 대체하면
//! 오래된 "실시간" 데이터가 신선한 것처럼 제공될 수 있기 때문입니다.

use crate::error::{CacheError, Result};
use report_core::{NamespaceDescriptor, StrategyBand};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// 리포트 집계에서 사용하는 기본 데이터 도메인.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataDomain {
    /// 시장 지표 (지수, 환율, 변동성)
    MarketIndicators,
    /// 뉴스/기사 풀
    ArticlePool,
    /// 자금 흐름 신호 (CMF 등)
    MoneyFlow,
    /// 감성 분석 결과
    SentimentAnalysis,
}

impl DataDomain {
    pub const ALL: [DataDomain; 4] = [
        DataDomain::MarketIndicators,
        DataDomain::ArticlePool,
        DataDomain::MoneyFlow,
        DataDomain::SentimentAnalysis,
    ];

    /// 네임스페이스 이름.
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::MarketIndicators => "market_indicators",
            Self::ArticlePool => "article_pool",
            Self::MoneyFlow => "money_flow",
            Self::SentimentAnalysis => "sentiment_analysis",
        }
    }

    pub fn band(&self) -> StrategyBand {
        match self {
            Self::MarketIndicators => StrategyBand::Interactive,
            Self::ArticlePool => StrategyBand::Batch,
            Self::MoneyFlow => StrategyBand::RealTime,
            Self::SentimentAnalysis => StrategyBand::Batch,
        }
    }

    /// 도메인 기본 디스크립터.
    pub fn descriptor(&self) -> NamespaceDescriptor {
        let builder = NamespaceDescriptor::builder(self.namespace(), self.band());
        let builder = match self {
            Self::SentimentAnalysis => builder
                .l2_ttl(Duration::from_secs(3600))
                .l1_max_entries(100),
            Self::ArticlePool => builder.l2_ttl(Duration::from_secs(6 * 3600)),
            _ => builder,
        };
        // 상수 정책이므로 검증 실패는 코드 결함
        builder
            .build()
            .unwrap_or_else(|e| unreachable!("built-in namespace {} is invalid: {}", self, e))
    }
}

impl fmt::Display for DataDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace())
    }
}

/// 네임스페이스 레지스트리.
#[derive(Debug, Clone, Default)]
pub struct NamespaceRegistry {
    namespaces: BTreeMap<String, Arc<NamespaceDescriptor>>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 기본 데이터 도메인이 모두 등록된 레지스트리.
    pub fn with_domains() -> Result<Self> {
        let mut registry = Self::new();
        for domain in DataDomain::ALL {
            registry.register(domain.descriptor())?;
        }
        Ok(registry)
    }

    /// 네임스페이스를 등록합니다.
    ///
    /// - 같은 서술자 재등록: 아무 것도 하지 않음
    /// - 같은 이름, 다른 버전 태그: `Configuration` 오류
    /// - 같은 이름과 버전, 다른 TTL/용량/접두사: `Configuration` 오류
    /// - 다른 네임스페이스와 키 접두사가 겹침: `Configuration` 오류
    pub fn register(&mut self, descriptor: NamespaceDescriptor) -> Result<()> {
        descriptor.validate()?;

        if let Some(existing) = self.namespaces.get(descriptor.name()) {
            if existing.version_tag() != descriptor.version_tag() {
                return Err(CacheError::Configuration(format!(
                    "namespace '{}' already registered with version '{}', got '{}'",
                    descriptor.name(),
                    existing.version_tag(),
                    descriptor.version_tag()
                )));
            }
            if **existing != descriptor {
                return Err(CacheError::Configuration(format!(
                    "namespace '{}' version '{}' already registered with a different policy",
                    descriptor.name(),
                    descriptor.version_tag()
                )));
            }
            debug!(namespace = descriptor.name(), "Namespace already registered");
            return Ok(());
        }

        if let Some(other) = self.namespaces.values().find(|other| {
            other.key_prefix().starts_with(descriptor.key_prefix())
                || descriptor.key_prefix().starts_with(other.key_prefix())
        }) {
            return Err(CacheError::Configuration(format!(
                "key prefix '{}' of namespace '{}' overlaps prefix '{}' of namespace '{}'",
                descriptor.key_prefix(),
                descriptor.name(),
                other.key_prefix(),
                other.name()
            )));
        }

        debug!(
            namespace = descriptor.name(),
            band = %descriptor.strategy_band(),
            l1_ttl_secs = descriptor.l1_ttl().as_secs(),
            l2_ttl_secs = descriptor.l2_ttl().as_secs(),
            l1_max_entries = descriptor.l1_max_entries(),
            "Namespace registered"
        );
        self.namespaces
            .insert(descriptor.name().to_string(), Arc::new(descriptor));
        Ok(())
    }

    /// 여러 네임스페이스를 순서대로 등록합니다. 첫 오류에서 중단합니다.
    pub fn register_all<I>(&mut self, descriptors: I) -> Result<()>
    where
        I: IntoIterator<Item = NamespaceDescriptor>,
    {
        for descriptor in descriptors {
            self.register(descriptor)?;
        }
        Ok(())
    }

    /// 네임스페이스를 조회합니다. 미등록이면 `Configuration` 오류.
    pub fn resolve(&self, name: &str) -> Result<Arc<NamespaceDescriptor>> {
        self.namespaces
            .get(name)
            .cloned()
            .ok_or_else(|| CacheError::Configuration(format!("namespace '{}' is not registered", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.namespaces.contains_key(name)
    }

    /// 이름순으로 정렬된 디스크립터 목록.
    pub fn descriptors(&self) -> impl Iterator<Item = &Arc<NamespaceDescriptor>> {
        self.namespaces.values()
    }

    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}
