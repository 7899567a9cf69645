//! 포트폴리오 최적화 실행.

use std::path::PathBuf;

use anyhow::{Context, Result};
use quant_core::{ReturnsTable, StockInput};
use quant_portfolio::{
    AllocationConfig, CapitalAllocation, CapitalAllocator, OptimizationRun, OptimizerConfig,
    PortfolioOptimizer, PortfolioWeights, RiskParityOptimizer, RunOutcome, SharpeOptimizer,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use super::input::{load_returns, load_stocks};
use super::write_output;

/// 최적화 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    RiskParity,
    MaxSharpe,
    MinVariance,
}

impl Method {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "risk-parity" | "rp" => Ok(Self::RiskParity),
            "max-sharpe" | "sharpe" => Ok(Self::MaxSharpe),
            "min-variance" | "gmv" => Ok(Self::MinVariance),
            _ => Err(anyhow::anyhow!(
                "Invalid method: {}. Use: risk-parity, max-sharpe, min-variance",
                s
            )),
        }
    }
}

/// 최적화 명령 설정.
#[derive(Debug)]
pub struct OptimizeConfig {
    /// 종목 목록 JSON 경로
    pub stocks: PathBuf,
    /// 수익률 CSV 경로
    pub returns: Option<PathBuf>,
    /// 최적화 방식
    pub method: Method,
    /// 결과 저장 경로 (없으면 stdout)
    pub output: Option<PathBuf>,
    /// 원화 투자 자금
    pub capital: Option<Decimal>,
}

/// 최적화 결과 리포트.
///
/// 비중 필드는 `PortfolioWeights` JSON과 동일한 최상위 키로 펼쳐집니다.
#[derive(Debug, Serialize)]
pub struct OptimizeReport {
    #[serde(flatten)]
    pub portfolio: PortfolioWeights,
    #[serde(flatten)]
    pub outcome: RunOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation: Option<CapitalAllocation>,
}

/// 종목/수익률로 선택한 최적화를 실행합니다.
pub fn run_method(
    method: Method,
    optimizer_config: &OptimizerConfig,
    stocks: &[StockInput],
    returns: Option<&ReturnsTable>,
) -> Result<OptimizationRun> {
    let run = match method {
        Method::RiskParity => {
            RiskParityOptimizer::new(optimizer_config.clone()).run(stocks, returns)?
        }
        Method::MaxSharpe => SharpeOptimizer::new(optimizer_config.clone()).run(stocks, returns)?,
        Method::MinVariance => {
            SharpeOptimizer::new(optimizer_config.clone()).minimum_variance(stocks, returns)?
        }
    };
    Ok(run)
}

/// 최적화를 실행하고 결과를 기록합니다.
pub fn optimize(
    config: OptimizeConfig,
    optimizer_config: &OptimizerConfig,
    allocation_config: &AllocationConfig,
) -> Result<OptimizeReport> {
    let stocks = load_stocks(&config.stocks)?;
    let returns = config.returns.as_deref().map(load_returns).transpose()?;

    let run = run_method(config.method, optimizer_config, &stocks, returns.as_ref())
        .context("Optimization rejected")?;

    if let RunOutcome::Fallback { reason } = &run.outcome {
        warn!(%reason, "Equal-weight fallback used");
    }

    let allocation = config
        .capital
        .map(|capital| {
            CapitalAllocator::new(allocation_config.clone()).allocate(&run.weights, capital)
        })
        .transpose()
        .context("Capital allocation failed")?;

    let report = OptimizeReport {
        portfolio: run.weights,
        outcome: run.outcome,
        allocation,
    };

    let json = serde_json::to_string_pretty(&report).context("Failed to serialize result")?;
    write_output(&json, config.output.as_deref())?;

    info!(
        method = %report.portfolio.optimization_method,
        sharpe = report.portfolio.sharpe_ratio,
        "Optimize command finished"
    );
    Ok(report)
}
