//! 최적화 결과 타입.

use std::fmt;

use quant_core::StockInput;
use serde::{Deserialize, Serialize};

use crate::covariance::CovarianceMatrix;
use crate::linalg::{dot, equal_weights};

/// 결과를 만든 최적화 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationMethod {
    /// 동일 리스크 기여 (리스크 패리티)
    RiskParity,
    /// 샤프 비율 최대화
    MaxSharpe,
    /// 최소 분산
    MinVariance,
    /// 실패 시 균등가중 대체
    EqualWeightFallback,
}

impl OptimizationMethod {
    /// JSON 계약에 쓰이는 태그 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizationMethod::RiskParity => "risk_parity",
            OptimizationMethod::MaxSharpe => "max_sharpe",
            OptimizationMethod::MinVariance => "min_variance",
            OptimizationMethod::EqualWeightFallback => "equal_weight_fallback",
        }
    }
}

impl fmt::Display for OptimizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 포트폴리오 비중과 요약 지표.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioWeights {
    /// 종목 코드 (입력 순서)
    pub stock_codes: Vec<String>,
    /// 비중 (합계 1)
    pub weights: Vec<f64>,
    /// 기대수익률 (소수)
    pub expected_return: f64,
    /// 기대 변동성 (소수)
    pub expected_volatility: f64,
    /// 샤프 비율
    pub sharpe_ratio: f64,
    /// 리스크 기여도 (퍼센트, 합계 100)
    pub risk_contributions: Vec<f64>,
    /// 최적화 방식 태그
    pub optimization_method: OptimizationMethod,
}

impl PortfolioWeights {
    /// 최적화 해와 공분산으로 결과를 조립합니다.
    pub fn from_solution(
        stocks: &[StockInput],
        weights: Vec<f64>,
        covariance: &CovarianceMatrix,
        risk_free_rate: f64,
        method: OptimizationMethod,
    ) -> Self {
        let expected_returns: Vec<f64> =
            stocks.iter().map(StockInput::expected_return_decimal).collect();
        let expected_return = dot(&weights, &expected_returns);
        let expected_volatility = covariance.variance(&weights).max(0.0).sqrt();
        let sharpe_ratio = sharpe_ratio(expected_return, expected_volatility, risk_free_rate);
        let risk_contributions = risk_contributions_pct(&weights, covariance);

        Self {
            stock_codes: stocks.iter().map(|s| s.stock_code.clone()).collect(),
            weights,
            expected_return,
            expected_volatility,
            sharpe_ratio,
            risk_contributions,
            optimization_method: method,
        }
    }

    /// 균등가중 대체 결과.
    ///
    /// 변동성은 `assumed_volatility`로 고정하고 리스크 기여도도 균등하게 둡니다.
    /// 기대수익률이 유한하지 않은 레코드는 0으로 취급합니다.
    pub fn equal_weight(stocks: &[StockInput], risk_free_rate: f64, assumed_volatility: f64) -> Self {
        let n = stocks.len();
        let weights = equal_weights(n);
        let expected_return = if n == 0 {
            0.0
        } else {
            stocks
                .iter()
                .map(|s| {
                    let r = s.expected_return_decimal();
                    if r.is_finite() {
                        r
                    } else {
                        0.0
                    }
                })
                .sum::<f64>()
                / n as f64
        };

        Self {
            stock_codes: stocks.iter().map(|s| s.stock_code.clone()).collect(),
            weights,
            expected_return,
            expected_volatility: assumed_volatility,
            sharpe_ratio: sharpe_ratio(expected_return, assumed_volatility, risk_free_rate),
            risk_contributions: if n == 0 {
                Vec::new()
            } else {
                vec![100.0 / n as f64; n]
            },
            optimization_method: OptimizationMethod::EqualWeightFallback,
        }
    }

    /// 종목 수.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// 비어 있는지 확인.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// 특정 종목의 비중.
    pub fn weight_of(&self, code: &str) -> Option<f64> {
        self.stock_codes
            .iter()
            .position(|c| c == code)
            .map(|i| self.weights[i])
    }

    /// 대체 결과인지 확인.
    pub fn is_fallback(&self) -> bool {
        self.optimization_method == OptimizationMethod::EqualWeightFallback
    }

    /// 유효 종목 수 (1 / Σw²).
    pub fn effective_num_assets(&self) -> f64 {
        let hhi: f64 = self.weights.iter().map(|w| w * w).sum();
        if hhi <= 0.0 {
            0.0
        } else {
            1.0 / hhi
        }
    }

    /// 분산 비율 (가중평균 변동성 / 포트폴리오 변동성).
    pub fn diversification_ratio(&self, volatilities: &[f64]) -> f64 {
        if self.expected_volatility <= 0.0 {
            return 1.0;
        }
        dot(&self.weights, volatilities) / self.expected_volatility
    }

    /// 보기 좋게 들여쓴 JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// (수익률 - 무위험) / 변동성. 변동성이 0 이하이면 0.
pub fn sharpe_ratio(expected_return: f64, volatility: f64, risk_free_rate: f64) -> f64 {
    if volatility <= 0.0 {
        0.0
    } else {
        (expected_return - risk_free_rate) / volatility
    }
}

/// 자산별 리스크 기여도를 퍼센트(합계 100)로 계산합니다.
///
/// `rc_i = w_i × (Σw)_i / σ_p`. 분산이 0이면 균등 분배합니다.
pub fn risk_contributions_pct(weights: &[f64], covariance: &CovarianceMatrix) -> Vec<f64> {
    let n = weights.len();
    if n == 0 {
        return Vec::new();
    }

    let sigma_w = covariance.mul_vec(weights);
    let variance = dot(weights, &sigma_w);
    if variance <= 0.0 || !variance.is_finite() {
        return vec![100.0 / n as f64; n];
    }

    let volatility = variance.sqrt();
    let contributions: Vec<f64> = weights
        .iter()
        .zip(&sigma_w)
        .map(|(w, m)| w * m / volatility)
        .collect();
    let total: f64 = contributions.iter().sum();

    contributions.iter().map(|rc| rc / total * 100.0).collect()
}
