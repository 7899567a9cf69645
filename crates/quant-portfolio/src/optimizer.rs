//! 최적화기 공통 인터페이스.
//!
//! 각 최적화기는 [`PortfolioOptimizer::solve`]만 구현하고, 입력 검증과
//! 균등가중 대체 처리는 기본 메서드 [`run`](PortfolioOptimizer::run)이 맡습니다.
//!
//! | 경로 | `run()` | `optimize()` |
//! |------|---------|--------------|
//! | 정상 수렴 | `Ok(RunOutcome::Converged)` | 최적화된 비중 |
//! | 수치 실패/잘못된 레코드 | `Ok(RunOutcome::Fallback)` | 균등가중 비중 |
//! | 빈 종목 목록 | `Err(EmptyUniverse)` | `Err(EmptyUniverse)` |

use quant_core::{ReturnsTable, StockInput};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::OptimizerConfig;
use crate::error::{OptimizationError, OptimizationResult};
use crate::weights::{OptimizationMethod, PortfolioWeights};

/// 최적화 실행 경로.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// 최적화가 정상 수렴함
    Converged,
    /// 실패하여 균등가중으로 대체함
    Fallback {
        /// 실패 사유
        reason: String,
    },
}

/// 최적화 실행 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRun {
    /// 최종 비중 (대체 시 균등가중)
    pub weights: PortfolioWeights,
    /// 수렴/대체 경로
    pub outcome: RunOutcome,
}

impl OptimizationRun {
    /// 정상 수렴 결과.
    pub fn converged(weights: PortfolioWeights) -> Self {
        Self {
            weights,
            outcome: RunOutcome::Converged,
        }
    }

    /// 대체 결과.
    pub fn fallback(weights: PortfolioWeights, reason: impl Into<String>) -> Self {
        Self {
            weights,
            outcome: RunOutcome::Fallback {
                reason: reason.into(),
            },
        }
    }

    /// 정상 수렴 여부.
    pub fn is_converged(&self) -> bool {
        matches!(self.outcome, RunOutcome::Converged)
    }

    /// 비중만 꺼냅니다.
    pub fn into_weights(self) -> PortfolioWeights {
        self.weights
    }
}

/// 포트폴리오 최적화기.
pub trait PortfolioOptimizer {
    /// 정상 수렴 시 결과에 붙는 방식 태그.
    fn method(&self) -> OptimizationMethod;

    /// 최적화 설정.
    fn config(&self) -> &OptimizerConfig;

    /// 최적화 본체. 종목 목록은 비어 있지 않음이 보장됩니다.
    fn solve(
        &self,
        stocks: &[StockInput],
        returns: Option<&ReturnsTable>,
    ) -> OptimizationResult<PortfolioWeights>;

    /// 최적화를 실행하고 어떤 경로로 결과가 나왔는지 함께 반환합니다.
    ///
    /// 빈 종목 목록만 에러로 돌려주고, 나머지 실패는 모두 균등가중 대체
    /// 결과로 흡수합니다.
    fn run(
        &self,
        stocks: &[StockInput],
        returns: Option<&ReturnsTable>,
    ) -> OptimizationResult<OptimizationRun> {
        if stocks.is_empty() {
            return Err(OptimizationError::EmptyUniverse);
        }

        let span = quant_core::portfolio_span!("optimize", self.method(), stocks.len());
        let _guard = span.enter();

        match self.solve(stocks, returns) {
            Ok(weights) => {
                info!(
                    sharpe = weights.sharpe_ratio,
                    volatility = weights.expected_volatility,
                    "Optimization completed"
                );
                Ok(OptimizationRun::converged(weights))
            }
            Err(err) if err.is_hard_failure() => Err(err),
            Err(err) => {
                if err.is_degraded() {
                    warn!(error = %err, "Optimization degraded, using equal weights");
                } else {
                    error!(error = %err, "Optimization failed, using equal weights");
                }
                let config = self.config();
                let weights = PortfolioWeights::equal_weight(
                    stocks,
                    config.risk_free_rate,
                    config.fallback_volatility,
                );
                Ok(OptimizationRun::fallback(weights, err.to_string()))
            }
        }
    }

    /// 최적화된 비중을 반환합니다. 실패 시 균등가중 비중을 반환합니다.
    fn optimize(
        &self,
        stocks: &[StockInput],
        returns: Option<&ReturnsTable>,
    ) -> OptimizationResult<PortfolioWeights> {
        self.run(stocks, returns).map(OptimizationRun::into_weights)
    }
}

/// 모든 레코드를 검증합니다.
pub(crate) fn validate_stocks(stocks: &[StockInput]) -> OptimizationResult<()> {
    for stock in stocks {
        stock.validate()?;
    }
    Ok(())
}
