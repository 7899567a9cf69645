//! 리스크 패리티 최적화.
//!
//! 모든 종목이 포트폴리오 위험에 같은 크기로 기여하도록 비중을 고정점
//! 반복으로 조정합니다.
//!
//! 1. 공분산 추정 후 변동성 역수로 초기 비중 설정
//! 2. 반복마다 `rc_i = w_i × (Σw)_i / σ_p`를 계산하고
//!    `w_i ← w_i × (σ_p² / N) / rc_i` 후 재정규화
//! 3. `std(rc) < convergence_tolerance`이면 조기 종료
//! 4. 비중 한도로 사영한 뒤 수익률/변동성/샤프 계산
//!
//! 음의 상관 때문에 기여도가 0 이하로 떨어지면 고정점 갱신이 정의되지
//! 않으므로, 순환 좌표 하강(`Σ_ii x_i² + c_i x_i − 1/N = 0`의 양의 근)으로
//! 전환합니다. 양정치 Σ에서는 항상 수렴합니다.
//!
//! # 예제
//!
//! ```rust,ignore
//! use quant_portfolio::{OptimizerConfig, PortfolioOptimizer, RiskParityOptimizer};
//!
//! let optimizer = RiskParityOptimizer::new(OptimizerConfig::default());
//! let weights = optimizer.optimize(&stocks, None)?;
//! ```

use quant_core::{ReturnsTable, StockInput};
use tracing::debug;

use crate::config::OptimizerConfig;
use crate::covariance::{CovarianceEstimator, CovarianceMatrix, DefaultCovarianceEstimator};
use crate::error::{OptimizationError, OptimizationResult};
use crate::linalg::{normalize, population_std, project_to_bounds};
use crate::optimizer::{validate_stocks, PortfolioOptimizer};
use crate::weights::{OptimizationMethod, PortfolioWeights};

/// 동일 리스크 기여 최적화기.
#[derive(Debug, Clone)]
pub struct RiskParityOptimizer<E = DefaultCovarianceEstimator> {
    config: OptimizerConfig,
    estimator: E,
}

impl RiskParityOptimizer<DefaultCovarianceEstimator> {
    /// 기본 공분산 추정기로 생성합니다.
    pub fn new(config: OptimizerConfig) -> Self {
        Self::with_estimator(config, DefaultCovarianceEstimator::default())
    }
}

impl Default for RiskParityOptimizer<DefaultCovarianceEstimator> {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}

impl<E: CovarianceEstimator> RiskParityOptimizer<E> {
    /// 공분산 추정 전략을 지정해 생성합니다.
    pub fn with_estimator(config: OptimizerConfig, estimator: E) -> Self {
        Self { config, estimator }
    }

    /// 공분산 추정기.
    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// 고정점 반복으로 동일 리스크 기여 비중을 구합니다 (한도 적용 전).
    ///
    /// 반복 한도에 도달해도 마지막 비중을 반환합니다.
    pub fn equal_risk_weights(&self, covariance: &CovarianceMatrix) -> OptimizationResult<Vec<f64>> {
        let n = covariance.dim();
        let volatilities = covariance.volatilities();

        if let Some(i) = volatilities.iter().position(|v| *v <= 0.0) {
            return Err(OptimizationError::NumericalInstability(format!(
                "asset {} has zero volatility",
                i
            )));
        }

        let inverse_vol: Vec<f64> = volatilities.iter().map(|v| 1.0 / v).collect();
        let mut weights = normalize(&inverse_vol).ok_or_else(|| {
            OptimizationError::NumericalInstability("cannot normalize inverse volatility".into())
        })?;

        for iteration in 0..self.config.max_iterations {
            let sigma_w = covariance.mul_vec(&weights);
            let variance: f64 = weights.iter().zip(&sigma_w).map(|(w, m)| w * m).sum();
            if !(variance > 0.0 && variance.is_finite()) {
                return Err(OptimizationError::NumericalInstability(format!(
                    "portfolio variance {} at iteration {}",
                    variance, iteration
                )));
            }
            let volatility = variance.sqrt();

            let contributions: Vec<f64> = weights
                .iter()
                .zip(&sigma_w)
                .map(|(w, m)| w * m / volatility)
                .collect();
            let target = variance / n as f64;

            let dispersion = population_std(&contributions);

            if contributions.iter().any(|rc| *rc <= 0.0) {
                debug!(
                    iteration,
                    "Non-positive risk contribution, switching to coordinate descent"
                );
                return self.coordinate_descent(covariance, &inverse_vol);
            }

            let scaled: Vec<f64> = weights
                .iter()
                .zip(&contributions)
                .map(|(w, rc)| w * (target / rc))
                .collect();
            weights = normalize(&scaled).ok_or_else(|| {
                OptimizationError::NumericalInstability("weights collapsed to zero".into())
            })?;

            if dispersion < self.config.convergence_tolerance {
                debug!(iteration, dispersion, "Risk parity converged");
                return Ok(weights);
            }
        }

        debug!(
            iterations = self.config.max_iterations,
            "Risk parity reached iteration limit"
        );
        Ok(weights)
    }

    /// 순환 좌표 하강으로 동일 리스크 기여 비중을 구합니다.
    ///
    /// 각 좌표에서 `Σ_ii x_i² + c_i x_i − 1/N = 0`의 양의 근을 취하며
    /// (`c_i = Σ_{j≠i} Σ_ij x_j`), 기여도 비율의 표준편차가
    /// `convergence_tolerance` 미만이 되면 정규화한 비중을 반환합니다.
    fn coordinate_descent(
        &self,
        covariance: &CovarianceMatrix,
        start: &[f64],
    ) -> OptimizationResult<Vec<f64>> {
        let n = covariance.dim();
        let budget = 1.0 / n as f64;
        let mut x = normalize(start).ok_or_else(|| {
            OptimizationError::NumericalInstability("cannot normalize starting weights".into())
        })?;

        for sweep in 0..self.config.max_iterations {
            for i in 0..n {
                let diagonal = covariance.get(i, i);
                let cross: f64 = (0..n)
                    .filter(|j| *j != i)
                    .map(|j| covariance.get(i, j) * x[j])
                    .sum();
                x[i] = (-cross + (cross * cross + 4.0 * diagonal * budget).sqrt())
                    / (2.0 * diagonal);
            }

            let weights = normalize(&x).ok_or_else(|| {
                OptimizationError::NumericalInstability("weights collapsed to zero".into())
            })?;
            let sigma_w = covariance.mul_vec(&weights);
            let variance: f64 = weights.iter().zip(&sigma_w).map(|(w, m)| w * m).sum();
            if !(variance > 0.0 && variance.is_finite()) {
                return Err(OptimizationError::NumericalInstability(format!(
                    "portfolio variance {} at sweep {}",
                    variance, sweep
                )));
            }

            let shares: Vec<f64> = weights
                .iter()
                .zip(&sigma_w)
                .map(|(w, m)| w * m / variance)
                .collect();
            let dispersion = population_std(&shares);
            if dispersion < self.config.convergence_tolerance {
                debug!(sweep, dispersion, "Coordinate descent converged");
                return Ok(weights);
            }
        }

        Err(OptimizationError::NotConverged {
            iterations: self.config.max_iterations,
        })
    }
}

impl<E: CovarianceEstimator> PortfolioOptimizer for RiskParityOptimizer<E> {
    fn method(&self) -> OptimizationMethod {
        OptimizationMethod::RiskParity
    }

    fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    fn solve(
        &self,
        stocks: &[StockInput],
        returns: Option<&ReturnsTable>,
    ) -> OptimizationResult<PortfolioWeights> {
        self.config
            .validate()
            .map_err(|e| OptimizationError::InvalidConfig(e.to_string()))?;
        validate_stocks(stocks)?;

        let covariance = self.estimator.estimate(stocks, returns)?;
        debug!(estimator = self.estimator.name(), "Covariance estimated");

        let raw = self.equal_risk_weights(&covariance)?;
        let (lower, upper) = self.config.effective_bounds(stocks.len());
        let weights = project_to_bounds(&raw, lower, upper);

        Ok(PortfolioWeights::from_solution(
            stocks,
            weights,
            &covariance,
            self.config.risk_free_rate,
            OptimizationMethod::RiskParity,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::covariance::SectorHeuristicEstimator;

    fn three_semis() -> Vec<StockInput> {
        vec![
            StockInput::new("005930", "삼성전자", "반도체", 20.0, 5.0),
            StockInput::new("000660", "SK하이닉스", "반도체", 50.0, 10.0),
            StockInput::new("042700", "한미반도체", "반도체", 80.0, 15.0),
        ]
    }

    #[test]
    fn test_inverse_volatility_ordering() {
        let optimizer = RiskParityOptimizer::default();
        let result = optimizer.optimize(&three_semis(), None).unwrap();

        assert_eq!(result.optimization_method, OptimizationMethod::RiskParity);
        assert!(result.weights[0] > result.weights[1]);
        assert!(result.weights[1] > result.weights[2]);

        let sum: f64 = result.weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_equal_risk_contributions_without_binding_bounds() {
        let optimizer = RiskParityOptimizer::default();
        let result = optimizer.optimize(&three_semis(), None).unwrap();

        // N=3에서는 상한이 완화되므로 기여도가 균등해야 함
        for rc in &result.risk_contributions {
            assert!((rc - 100.0 / 3.0).abs() < 1e-3, "rc = {}", rc);
        }
    }

    #[test]
    fn test_mixed_sector_converges() {
        let stocks = vec![
            StockInput::new("A", "A", "반도체", 10.0, 8.0),
            StockInput::new("B", "B", "반도체", 30.0, 12.0),
            StockInput::new("C", "C", "바이오", 50.0, 15.0),
            StockInput::new("D", "D", "바이오", 70.0, 20.0),
            StockInput::new("E", "E", "금융", 90.0, 25.0),
            StockInput::new("F", "F", "금융", 20.0, 6.0),
            StockInput::new("G", "G", "유통", 60.0, 14.0),
        ];

        let optimizer = RiskParityOptimizer::with_estimator(
            OptimizerConfig::default().with_bounds(0.0, 1.0),
            SectorHeuristicEstimator::default(),
        );
        let cov = optimizer.estimator().estimate(&stocks, None).unwrap();
        let weights = optimizer.equal_risk_weights(&cov).unwrap();

        let rc = crate::weights::risk_contributions_pct(&weights, &cov);
        for value in rc {
            assert!((value - 100.0 / 7.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_negative_correlation_uses_coordinate_descent() {
        // A-B 상관 -0.9: 역변동성 초기값에서 B의 기여도가 음수
        let cov = CovarianceMatrix::from_parts(
            &[0.2, 0.3, 0.25],
            &[
                vec![1.0, -0.9, 0.2],
                vec![-0.9, 1.0, -0.2],
                vec![0.2, -0.2, 1.0],
            ],
        )
        .unwrap();
        let optimizer = RiskParityOptimizer::new(OptimizerConfig::default().with_bounds(0.0, 1.0));
        let weights = optimizer.equal_risk_weights(&cov).unwrap();

        let sum: f64 = weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(weights.iter().all(|w| *w > 0.0));
        for rc in crate::weights::risk_contributions_pct(&weights, &cov) {
            assert!((rc - 100.0 / 3.0).abs() < 1e-3, "rc = {}", rc);
        }
    }

    #[test]
    fn test_malformed_record_falls_back() {
        let mut stocks = three_semis();
        stocks[1].risk_score = f64::NAN;

        let run = RiskParityOptimizer::default().run(&stocks, None).unwrap();
        assert!(!run.is_converged());
        assert_eq!(
            run.weights.optimization_method,
            OptimizationMethod::EqualWeightFallback
        );
    }

    #[test]
    fn test_invalid_config_is_hard_failure() {
        let optimizer = RiskParityOptimizer::new(OptimizerConfig::default().with_bounds(0.5, 0.1));
        assert!(matches!(
            optimizer.optimize(&three_semis(), None),
            Err(OptimizationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_deterministic() {
        let optimizer = RiskParityOptimizer::default();
        let a = optimizer.optimize(&three_semis(), None).unwrap();
        let b = optimizer.optimize(&three_semis(), None).unwrap();
        assert_eq!(a, b);
    }
}
