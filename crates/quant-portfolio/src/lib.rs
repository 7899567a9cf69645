//! 포트폴리오 최적화.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 리스크 패리티 (동일 리스크 기여) 비중 계산
//! - 샤프 비율 최대화 및 최소 분산 포트폴리오
//! - 효율적 투자선 계산
//! - 공분산 추정 전략 (섹터 휴리스틱, 표본, 축소)
//! - 최적화 실패 시 균등가중 대체
//! - 원화 자금 배분
//!
//! # 예제
//!
//! ```rust,ignore
//! use quant_portfolio::{OptimizerConfig, PortfolioOptimizer, SharpeOptimizer};
//!
//! let optimizer = SharpeOptimizer::new(OptimizerConfig::default());
//! let run = optimizer.run(&stocks, Some(&returns))?;
//! if !run.is_converged() {
//!     // 균등가중 대체 결과
//! }
//! ```

pub mod allocation;
pub mod config;
pub mod covariance;
pub mod error;
pub mod linalg;
pub mod optimizer;
pub mod risk_parity;
pub mod sharpe;
pub mod solver;
pub mod weights;

// 주요 타입 재내보내기
pub use allocation::{AllocationConfig, AllocationLine, CapitalAllocation, CapitalAllocator};
pub use config::{ConfigValidationError, OptimizerConfig};
pub use covariance::{
    CovarianceEstimator, CovarianceMatrix, DefaultCovarianceEstimator, SampleCovarianceEstimator,
    SectorHeuristicEstimator, ShrinkageEstimator,
};
pub use error::{OptimizationError, OptimizationResult};
pub use optimizer::{OptimizationRun, PortfolioOptimizer, RunOutcome};
pub use risk_parity::RiskParityOptimizer;
pub use sharpe::{FrontierPoint, SharpeOptimizer};
pub use solver::{Objective, ProjectedGradientSolver, SolverOutcome};
pub use weights::{risk_contributions_pct, sharpe_ratio, OptimizationMethod, PortfolioWeights};
