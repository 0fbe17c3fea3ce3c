//! 캐시 헬스 판정.
//!
//! 판정은 현재 카운터와 임계값만으로 계산되는 순수 함수입니다.
//! 알림은 이 결과를 소비하는 외부 협력자의 몫입니다.
//!
//! | 조건 | 결과 |
//! |------|------|
//! | 오류율 상한 초과 | unhealthy |
//! | 하한 2개 이상 미달 | unhealthy |
//! | 하한 1개가 허용 폭을 넘어 미달 | unhealthy |
//! | 하한 1개가 허용 폭 이내로 미달 | degraded |
//! | 그 외 | healthy |

use super::collector::CacheStats;
use report_core::HealthConfig;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// 헬스 상태. 순서는 심각도 순입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// 판정 임계값.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthThresholds {
    /// L1 적중률 하한 (전체 요청 대비)
    pub l1_hit_rate_floor: f64,
    /// L2 조회 적중률 하한 (L2까지 내려간 조회 대비)
    pub l2_hit_rate_floor: f64,
    pub error_rate_ceiling: f64,
    pub degraded_margin: f64,
    /// 이보다 적은 표본에서는 해당 지표를 평가하지 않음
    pub min_samples: u64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self::from(&HealthConfig::default())
    }
}

impl From<&HealthConfig> for HealthThresholds {
    fn from(config: &HealthConfig) -> Self {
        if !config.enabled {
            return Self::permissive();
        }
        Self {
            l1_hit_rate_floor: config.l1_hit_rate_floor,
            l2_hit_rate_floor: config.l2_hit_rate_floor,
            error_rate_ceiling: config.error_rate_ceiling,
            degraded_margin: config.degraded_margin,
            min_samples: config.min_samples,
        }
    }
}

impl HealthThresholds {
    /// 모든 하한이 0인 임계값. 단순 on/off 플래그 방식의 헬스 체크와 같습니다.
    pub fn permissive() -> Self {
        Self {
            l1_hit_rate_floor: 0.0,
            l2_hit_rate_floor: 0.0,
            error_rate_ceiling: f64::INFINITY,
            degraded_margin: 0.0,
            min_samples: 0,
        }
    }
}

/// 단일 통계에 대한 판정.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthAssessment {
    pub status: HealthStatus,
    pub issues: Vec<String>,
}

impl HealthAssessment {
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            issues: Vec::new(),
        }
    }
}

/// 통계를 임계값에 비춰 판정합니다.
pub fn evaluate(stats: &CacheStats, thresholds: &HealthThresholds) -> HealthAssessment {
    let mut issues = Vec::new();
    let mut severe = false;
    let mut floors_missed = 0;

    if stats.operations() >= thresholds.min_samples.max(1) {
        let error_rate = stats.error_rate();
        if error_rate > thresholds.error_rate_ceiling {
            issues.push(format!(
                "error rate {:.1}% exceeds ceiling {:.1}%",
                error_rate * 100.0,
                thresholds.error_rate_ceiling * 100.0
            ));
            severe = true;
        }
    }

    if stats.total_requests >= thresholds.min_samples.max(1) {
        let checks = [
            ("L1 hit rate", Some(stats.l1_hit_rate()), thresholds.l1_hit_rate_floor),
            ("L2 hit rate", stats.l2_lookup_hit_rate(), thresholds.l2_hit_rate_floor),
        ];

        for (label, rate, floor) in checks {
            let Some(rate) = rate else { continue };
            if rate >= floor {
                continue;
            }
            floors_missed += 1;
            if rate < floor - thresholds.degraded_margin {
                severe = true;
            }
            issues.push(format!(
                "{} {:.1}% below floor {:.1}%",
                label,
                rate * 100.0,
                floor * 100.0
            ));
        }
    }

    let status = if severe || floors_missed >= 2 {
        HealthStatus::Unhealthy
    } else if floors_missed == 1 {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };

    HealthAssessment { status, issues }
}

/// 네임스페이스별 상태 항목.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamespaceHealth {
    pub l1_hit_rate: f64,
    pub l2_hit_rate: f64,
    pub size: usize,
    pub evictions: u64,
    pub status: HealthStatus,
}

/// 운영 상태 엔드포인트용 리포트.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub overall_hit_rate: f64,
    pub per_namespace: BTreeMap<String, NamespaceHealth>,
    pub status: HealthStatus,
    pub issues: Vec<String>,
}

impl HealthReport {
    /// 네임스페이스 통계로부터 리포트를 만듭니다. 전체 상태는 가장 나쁜 네임스페이스 상태입니다.
    pub fn build(stats: &BTreeMap<String, CacheStats>, thresholds: &HealthThresholds) -> Self {
        let mut per_namespace = BTreeMap::new();
        let mut issues = Vec::new();
        let mut status = HealthStatus::Healthy;
        let mut total = CacheStats::default();

        for (name, ns_stats) in stats {
            let assessment = evaluate(ns_stats, thresholds);
            status = status.max(assessment.status);
            issues.extend(
                assessment
                    .issues
                    .into_iter()
                    .map(|issue| format!("{}: {}", name, issue)),
            );
            per_namespace.insert(
                name.clone(),
                NamespaceHealth {
                    l1_hit_rate: ns_stats.l1_hit_rate(),
                    l2_hit_rate: ns_stats.l2_hit_rate(),
                    size: ns_stats.size,
                    evictions: ns_stats.evictions,
                    status: assessment.status,
                },
            );
            total = total.merge(ns_stats);
        }

        Self {
            overall_hit_rate: total.overall_hit_rate(),
            per_namespace,
            status,
            issues,
        }
    }
}
