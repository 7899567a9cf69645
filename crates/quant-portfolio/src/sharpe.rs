//! 샤프 비율 최대화 및 효율적 투자선.
//!
//! `-(wᵀr - r_f) / √(wᵀΣw)`를 `Σw = 1`, `min_weight ≤ w_i ≤ max_weight` 제약 하에서
//! 최소화합니다. 솔버는 균등 비중에서 출발하며, 수렴하지 못하면 경고와 함께
//! 균등가중 대체 결과를 돌려줍니다.
//!
//! 효율적 투자선은 종목 기대수익률의 최솟값~최댓값 구간을 균등 분할한 목표
//! 수익률마다 `wᵀr = target` 제약을 추가해 변동성을 최소화한 점들입니다.

use quant_core::{ReturnsTable, StockInput};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::OptimizerConfig;
use crate::covariance::{CovarianceEstimator, CovarianceMatrix, DefaultCovarianceEstimator};
use crate::error::{OptimizationError, OptimizationResult};
use crate::linalg::{dot, equal_weights};
use crate::optimizer::{validate_stocks, OptimizationRun, PortfolioOptimizer};
use crate::solver::{Objective, ProjectedGradientSolver, SolverOutcome};
use crate::weights::{sharpe_ratio, OptimizationMethod, PortfolioWeights};

/// 변동성이 0인 포트폴리오에 부여하는 목적함수 값.
const ZERO_VOLATILITY_PENALTY: f64 = 1e10;

/// 분산이 이보다 작으면 변동성 0으로 간주.
const MIN_VARIANCE: f64 = 1e-16;

/// 음의 샤프 비율 목적함수.
struct NegativeSharpe<'a> {
    expected_returns: &'a [f64],
    covariance: &'a CovarianceMatrix,
    risk_free_rate: f64,
}

impl Objective for NegativeSharpe<'_> {
    fn value_and_gradient(&self, w: &[f64]) -> (f64, Vec<f64>) {
        let sigma_w = self.covariance.mul_vec(w);
        let variance = dot(w, &sigma_w);
        if variance <= MIN_VARIANCE {
            return (ZERO_VOLATILITY_PENALTY, vec![0.0; w.len()]);
        }

        let volatility = variance.sqrt();
        let excess = dot(w, self.expected_returns) - self.risk_free_rate;

        // ∂S/∂w = r/σ - excess·Σw/σ³
        let gradient = self
            .expected_returns
            .iter()
            .zip(&sigma_w)
            .map(|(r, m)| -(r / volatility - excess * m / (variance * volatility)))
            .collect();

        (-excess / volatility, gradient)
    }
}

/// 포트폴리오 분산 목적함수.
struct PortfolioVariance<'a> {
    covariance: &'a CovarianceMatrix,
}

impl Objective for PortfolioVariance<'_> {
    fn value_and_gradient(&self, w: &[f64]) -> (f64, Vec<f64>) {
        let sigma_w = self.covariance.mul_vec(w);
        let variance = dot(w, &sigma_w);
        (variance, sigma_w.iter().map(|m| 2.0 * m).collect())
    }
}

/// 효율적 투자선 위의 한 점.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierPoint {
    /// 목표(=달성) 기대수익률
    #[serde(rename = "return")]
    pub expected_return: f64,
    /// 최소 변동성
    pub volatility: f64,
    /// 샤프 비율
    pub sharpe_ratio: f64,
    /// 비중
    pub weights: Vec<f64>,
}

/// 샤프 비율 최대화 최적화기.
#[derive(Debug, Clone)]
pub struct SharpeOptimizer<E = DefaultCovarianceEstimator> {
    config: OptimizerConfig,
    estimator: E,
}

impl SharpeOptimizer<DefaultCovarianceEstimator> {
    /// 기본 공분산 추정기로 생성합니다.
    pub fn new(config: OptimizerConfig) -> Self {
        Self::with_estimator(config, DefaultCovarianceEstimator::default())
    }
}

impl Default for SharpeOptimizer<DefaultCovarianceEstimator> {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}

impl<E: CovarianceEstimator> SharpeOptimizer<E> {
    /// 공분산 추정 전략을 지정해 생성합니다.
    pub fn with_estimator(config: OptimizerConfig, estimator: E) -> Self {
        Self { config, estimator }
    }

    /// 공분산 추정기.
    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    fn solver(&self, n: usize) -> ProjectedGradientSolver {
        let (lower, upper) = self.config.effective_bounds(n);
        ProjectedGradientSolver::new(
            lower,
            upper,
            self.config.max_iterations,
            self.config.function_tolerance,
        )
    }

    /// 설정/레코드 검증 후 기대수익률 벡터와 공분산을 준비합니다.
    fn prepare(
        &self,
        stocks: &[StockInput],
        returns: Option<&ReturnsTable>,
    ) -> OptimizationResult<(Vec<f64>, CovarianceMatrix)> {
        self.config
            .validate()
            .map_err(|e| OptimizationError::InvalidConfig(e.to_string()))?;
        validate_stocks(stocks)?;

        let expected_returns = stocks
            .iter()
            .map(StockInput::expected_return_decimal)
            .collect();
        let covariance = self.estimator.estimate(stocks, returns)?;
        debug!(estimator = self.estimator.name(), "Covariance estimated");

        Ok((expected_returns, covariance))
    }

    fn max_sharpe(
        &self,
        expected_returns: &[f64],
        covariance: &CovarianceMatrix,
    ) -> OptimizationResult<SolverOutcome> {
        let objective = NegativeSharpe {
            expected_returns,
            covariance,
            risk_free_rate: self.config.risk_free_rate,
        };

        let n = expected_returns.len();
        let outcome = self.solver(n).minimize(&objective, &equal_weights(n))?;

        if outcome.value >= ZERO_VOLATILITY_PENALTY {
            return Err(OptimizationError::NumericalInstability(
                "optimal portfolio has zero volatility".into(),
            ));
        }

        debug!(
            iterations = outcome.iterations,
            sharpe = -outcome.value,
            "Sharpe solver finished"
        );
        Ok(outcome)
    }

    /// 효율적 투자선을 계산합니다.
    ///
    /// 종목 기대수익률의 최솟값~최댓값을 `n_points`개로 균등 분할한 목표마다
    /// 최소 변동성 포트폴리오를 구하고, 수렴한 점만 반환합니다.
    /// `n_points == 1`이면 최솟값 하나만 사용합니다.
    pub fn calculate_efficient_frontier(
        &self,
        stocks: &[StockInput],
        returns: Option<&ReturnsTable>,
        n_points: usize,
    ) -> OptimizationResult<Vec<FrontierPoint>> {
        if stocks.is_empty() {
            return Err(OptimizationError::EmptyUniverse);
        }
        if n_points == 0 {
            return Ok(Vec::new());
        }

        let (expected_returns, covariance) = self.prepare(stocks, returns)?;
        let n = stocks.len();
        let solver = self.solver(n);
        let objective = PortfolioVariance {
            covariance: &covariance,
        };

        let min_return = expected_returns.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_return = expected_returns
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);

        let targets: Vec<f64> = if n_points == 1 {
            vec![min_return]
        } else {
            let step = (max_return - min_return) / (n_points - 1) as f64;
            (0..n_points).map(|k| min_return + step * k as f64).collect()
        };

        let x0 = equal_weights(n);
        let mut frontier = Vec::with_capacity(targets.len());

        for target in targets {
            match solver.solve_with_equality(&objective, &expected_returns, target, &x0) {
                Ok(outcome) => {
                    let expected_return = dot(&outcome.x, &expected_returns);
                    let volatility = outcome.value.max(0.0).sqrt();
                    frontier.push(FrontierPoint {
                        expected_return,
                        volatility,
                        sharpe_ratio: sharpe_ratio(
                            expected_return,
                            volatility,
                            self.config.risk_free_rate,
                        ),
                        weights: outcome.x,
                    });
                }
                Err(err) => {
                    debug!(target, error = %err, "Frontier point skipped");
                }
            }
        }

        debug!(
            requested = n_points,
            solved = frontier.len(),
            "Efficient frontier computed"
        );
        Ok(frontier)
    }

    /// 최소 분산 포트폴리오 (수익률 제약 없는 투자선 왼쪽 끝).
    ///
    /// 최적화 실패 시 다른 최적화와 같은 균등가중 대체 규칙을 따릅니다.
    pub fn minimum_variance(
        &self,
        stocks: &[StockInput],
        returns: Option<&ReturnsTable>,
    ) -> OptimizationResult<OptimizationRun> {
        MinimumVariance { inner: self }.run(stocks, returns)
    }
}

impl<E: CovarianceEstimator> PortfolioOptimizer for SharpeOptimizer<E> {
    fn method(&self) -> OptimizationMethod {
        OptimizationMethod::MaxSharpe
    }

    fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    fn solve(
        &self,
        stocks: &[StockInput],
        returns: Option<&ReturnsTable>,
    ) -> OptimizationResult<PortfolioWeights> {
        let (expected_returns, covariance) = self.prepare(stocks, returns)?;

        let outcome = self
            .max_sharpe(&expected_returns, &covariance)
            .inspect_err(|err| {
                if let OptimizationError::NotConverged { iterations } = err {
                    warn!(iterations, "Sharpe optimization did not converge");
                }
            })?;

        Ok(PortfolioWeights::from_solution(
            stocks,
            outcome.x,
            &covariance,
            self.config.risk_free_rate,
            OptimizationMethod::MaxSharpe,
        ))
    }
}

/// 최소 분산 경로를 공통 실행 규칙에 태우기 위한 어댑터.
struct MinimumVariance<'a, E> {
    inner: &'a SharpeOptimizer<E>,
}

impl<E: CovarianceEstimator> PortfolioOptimizer for MinimumVariance<'_, E> {
    fn method(&self) -> OptimizationMethod {
        OptimizationMethod::MinVariance
    }

    fn config(&self) -> &OptimizerConfig {
        &self.inner.config
    }

    fn solve(
        &self,
        stocks: &[StockInput],
        returns: Option<&ReturnsTable>,
    ) -> OptimizationResult<PortfolioWeights> {
        let (_, covariance) = self.inner.prepare(stocks, returns)?;
        let n = stocks.len();
        let outcome = self
            .inner
            .solver(n)
            .minimize(&PortfolioVariance { covariance: &covariance }, &equal_weights(n))?;

        Ok(PortfolioWeights::from_solution(
            stocks,
            outcome.x,
            &covariance,
            self.inner.config.risk_free_rate,
            OptimizationMethod::MinVariance,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn universe() -> Vec<StockInput> {
        vec![
            StockInput::new("A", "A", "반도체", 10.0, 8.0),
            StockInput::new("B", "B", "반도체", 30.0, 12.0),
            StockInput::new("C", "C", "바이오", 50.0, 15.0),
            StockInput::new("D", "D", "바이오", 70.0, 20.0),
            StockInput::new("E", "E", "금융", 90.0, 25.0),
            StockInput::new("F", "F", "금융", 20.0, 6.0),
            StockInput::new("G", "G", "유통", 60.0, 14.0),
        ]
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let stocks = universe();
        let cov = DefaultCovarianceEstimator::default()
            .estimate(&stocks, None)
            .unwrap();
        let mu: Vec<f64> = stocks.iter().map(|s| s.expected_return_decimal()).collect();
        let objective = NegativeSharpe {
            expected_returns: &mu,
            covariance: &cov,
            risk_free_rate: 0.03,
        };

        let w = vec![0.1, 0.2, 0.1, 0.15, 0.15, 0.2, 0.1];
        let (f0, grad) = objective.value_and_gradient(&w);
        let h = 1e-7;
        for i in 0..w.len() {
            let mut bumped = w.clone();
            bumped[i] += h;
            let (f1, _) = objective.value_and_gradient(&bumped);
            let numeric = (f1 - f0) / h;
            assert!((numeric - grad[i]).abs() < 1e-4, "i={} {} vs {}", i, numeric, grad[i]);
        }
    }

    #[test]
    fn test_max_sharpe_beats_equal_weight() {
        let stocks = universe();
        let optimizer = SharpeOptimizer::default();
        let run = optimizer.run(&stocks, None).unwrap();

        assert!(run.is_converged());
        let result = run.weights;
        assert_eq!(result.optimization_method, OptimizationMethod::MaxSharpe);

        let cov = optimizer.estimator().estimate(&stocks, None).unwrap();
        let equal = PortfolioWeights::from_solution(
            &stocks,
            equal_weights(7),
            &cov,
            0.03,
            OptimizationMethod::MaxSharpe,
        );
        assert!(result.sharpe_ratio >= equal.sharpe_ratio - 1e-9);

        for w in &result.weights {
            assert!(*w >= 0.01 - 1e-9 && *w <= 0.25 + 1e-9);
        }
        let sum: f64 = result.weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_volatility_guard() {
        let cov = CovarianceMatrix::from_matrix(vec![vec![0.0, 0.0], vec![0.0, 0.0]]).unwrap();
        let objective = NegativeSharpe {
            expected_returns: &[0.1, 0.1],
            covariance: &cov,
            risk_free_rate: 0.03,
        };
        let (value, grad) = objective.value_and_gradient(&[0.5, 0.5]);
        assert_eq!(value, ZERO_VOLATILITY_PENALTY);
        assert!(grad.iter().all(|g| *g == 0.0));
    }

    #[test]
    fn test_frontier_points_are_consistent() {
        let optimizer = SharpeOptimizer::default();
        let frontier = optimizer
            .calculate_efficient_frontier(&universe(), None, 10)
            .unwrap();

        // 한도(1%~25%) 때문에 양 끝 목표는 도달 불가
        assert!(!frontier.is_empty());
        assert!(frontier.len() < 10);

        let gmv = optimizer.minimum_variance(&universe(), None).unwrap().weights;

        for point in &frontier {
            let sum: f64 = point.weights.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
            assert!(point.volatility >= gmv.expected_volatility - 1e-6);
        }

        for pair in frontier.windows(2) {
            assert!(pair[1].expected_return > pair[0].expected_return);
        }

        // 최소 분산 수익률 위쪽 구간에서는 목표 수익이 높을수록 변동성도 커짐
        let upper: Vec<&FrontierPoint> = frontier
            .iter()
            .filter(|p| p.expected_return >= gmv.expected_return)
            .collect();
        assert!(!upper.is_empty());
        for pair in upper.windows(2) {
            assert!(pair[1].volatility >= pair[0].volatility - 1e-6);
        }
    }

    #[test]
    fn test_frontier_edge_cases() {
        let optimizer = SharpeOptimizer::default();
        assert!(matches!(
            optimizer.calculate_efficient_frontier(&[], None, 10),
            Err(OptimizationError::EmptyUniverse)
        ));
        assert!(optimizer
            .calculate_efficient_frontier(&universe(), None, 0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_frontier_serializes_return_key() {
        let point = FrontierPoint {
            expected_return: 0.1,
            volatility: 0.2,
            sharpe_ratio: 0.35,
            weights: vec![1.0],
        };
        let value = serde_json::to_value(&point).unwrap();
        assert_eq!(value["return"], 0.1);
    }

    #[test]
    fn test_minimum_variance_below_max_sharpe_volatility() {
        let optimizer = SharpeOptimizer::default();
        let min_var = optimizer.minimum_variance(&universe(), None).unwrap();
        let max_sharpe = optimizer.optimize(&universe(), None).unwrap();

        assert!(min_var.is_converged());
        assert_eq!(
            min_var.weights.optimization_method,
            OptimizationMethod::MinVariance
        );
        assert!(min_var.weights.expected_volatility <= max_sharpe.expected_volatility + 1e-9);
    }
}
