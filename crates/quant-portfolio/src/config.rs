//! 최적화 설정.
//!
//! 비중 한도, 무위험 수익률, 반복/수렴 조건을 정의합니다.

use serde::{Deserialize, Serialize};

/// 포트폴리오 최적화 설정.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// 종목별 최소 비중 (기본값: 0.01)
    #[serde(default = "default_min_weight")]
    pub min_weight: f64,

    /// 종목별 최대 비중 (기본값: 0.25)
    #[serde(default = "default_max_weight")]
    pub max_weight: f64,

    /// 무위험 수익률 (기본값: 3%)
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,

    /// 최대 반복 횟수 (기본값: 1000)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// 리스크 패리티 수렴 판정값: 리스크 기여도 표준편차 (기본값: 1e-6)
    #[serde(default = "default_convergence_tolerance")]
    pub convergence_tolerance: f64,

    /// 솔버 목적함수 변화량 허용치 (기본값: 1e-9)
    #[serde(default = "default_function_tolerance")]
    pub function_tolerance: f64,

    /// 균등가중 대체 결과에 쓰는 가정 변동성 (기본값: 25%)
    #[serde(default = "default_fallback_volatility")]
    pub fallback_volatility: f64,
}

// 기본값 함수들
fn default_min_weight() -> f64 {
    0.01
}

fn default_max_weight() -> f64 {
    0.25
}

fn default_risk_free_rate() -> f64 {
    0.03
}

fn default_max_iterations() -> usize {
    1000
}

fn default_convergence_tolerance() -> f64 {
    1e-6
}

fn default_function_tolerance() -> f64 {
    1e-9
}

fn default_fallback_volatility() -> f64 {
    0.25
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            min_weight: default_min_weight(),
            max_weight: default_max_weight(),
            risk_free_rate: default_risk_free_rate(),
            max_iterations: default_max_iterations(),
            convergence_tolerance: default_convergence_tolerance(),
            function_tolerance: default_function_tolerance(),
            fallback_volatility: default_fallback_volatility(),
        }
    }
}

impl OptimizerConfig {
    /// 기본값으로 새 설정을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 분산을 강제하는 보수적 설정 (종목당 최대 15%).
    pub fn conservative() -> Self {
        Self {
            min_weight: 0.02,
            max_weight: 0.15,
            ..Self::default()
        }
    }

    /// 소수 종목 집중을 허용하는 설정 (종목당 최대 40%).
    pub fn concentrated() -> Self {
        Self {
            min_weight: 0.0,
            max_weight: 0.40,
            ..Self::default()
        }
    }

    /// 비중 한도를 설정합니다.
    pub fn with_bounds(mut self, min_weight: f64, max_weight: f64) -> Self {
        self.min_weight = min_weight;
        self.max_weight = max_weight;
        self
    }

    /// 무위험 수익률을 설정합니다.
    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    /// 종목 수 `n`에서 실제로 적용할 비중 하한/상한.
    ///
    /// `n * max_weight < 1`이면 합계 1을 만들 수 없으므로 상한을 1.0으로,
    /// `n * min_weight > 1`이면 하한을 0.0으로 완화합니다.
    pub fn effective_bounds(&self, n: usize) -> (f64, f64) {
        let n = n as f64;
        let lower = if n * self.min_weight > 1.0 {
            0.0
        } else {
            self.min_weight
        };
        let upper = if n * self.max_weight < 1.0 {
            1.0
        } else {
            self.max_weight
        };
        (lower, upper)
    }

    /// 설정 값을 검증합니다.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(0.0..1.0).contains(&self.min_weight) {
            return Err(ConfigValidationError::InvalidValue(
                "min_weight must be within [0, 1)".into(),
            ));
        }

        if self.max_weight <= 0.0 || self.max_weight > 1.0 {
            return Err(ConfigValidationError::InvalidValue(
                "max_weight must be within (0, 1]".into(),
            ));
        }

        if self.min_weight >= self.max_weight {
            return Err(ConfigValidationError::InvalidValue(
                "min_weight must be less than max_weight".into(),
            ));
        }

        if !self.risk_free_rate.is_finite() {
            return Err(ConfigValidationError::InvalidValue(
                "risk_free_rate must be finite".into(),
            ));
        }

        if self.max_iterations == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "max_iterations must be greater than 0".into(),
            ));
        }

        if self.convergence_tolerance <= 0.0 || self.function_tolerance <= 0.0 {
            return Err(ConfigValidationError::InvalidValue(
                "tolerances must be greater than 0".into(),
            ));
        }

        if self.fallback_volatility <= 0.0 {
            return Err(ConfigValidationError::InvalidValue(
                "fallback_volatility must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

/// 설정 검증 오류.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OptimizerConfig::default();

        assert_eq!(config.min_weight, 0.01);
        assert_eq!(config.max_weight, 0.25);
        assert_eq!(config.risk_free_rate, 0.03);
        assert_eq!(config.max_iterations, 1000);
        assert_eq!(config.function_tolerance, 1e-9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(OptimizerConfig::conservative().validate().is_ok());
        assert!(OptimizerConfig::concentrated().validate().is_ok());
        assert_eq!(OptimizerConfig::conservative().max_weight, 0.15);
    }

    #[test]
    fn test_config_validation() {
        let invalid = OptimizerConfig::default().with_bounds(0.3, 0.2);
        assert!(invalid.validate().is_err());

        let invalid = OptimizerConfig::default().with_bounds(0.0, 1.5);
        assert!(invalid.validate().is_err());

        let mut invalid = OptimizerConfig::default();
        invalid.max_iterations = 0;
        assert!(invalid.validate().is_err());

        let invalid = OptimizerConfig::default().with_risk_free_rate(f64::NAN);
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_effective_bounds() {
        let config = OptimizerConfig::default();

        // 4종목 이상이면 설정값 그대로
        assert_eq!(config.effective_bounds(4), (0.01, 0.25));
        assert_eq!(config.effective_bounds(20), (0.01, 0.25));

        // 3종목 × 25% < 100% → 상한 완화
        assert_eq!(config.effective_bounds(3), (0.01, 1.0));
        assert_eq!(config.effective_bounds(1), (0.01, 1.0));

        // 200종목 × 1% > 100% → 하한 완화
        assert_eq!(config.effective_bounds(200), (0.0, 0.25));
    }

    #[test]
    fn test_config_deserialize_with_defaults() {
        let config: OptimizerConfig = serde_json::from_str(r#"{"max_weight": 0.3}"#).unwrap();
        assert_eq!(config.max_weight, 0.3);
        assert_eq!(config.min_weight, 0.01);
        assert_eq!(config.risk_free_rate, 0.03);
    }
}
