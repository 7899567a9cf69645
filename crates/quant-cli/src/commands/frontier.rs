//! 효율적 투자선 계산.

use std::path::PathBuf;

use anyhow::{Context, Result};
use quant_portfolio::{FrontierPoint, OptimizerConfig, SharpeOptimizer};
use tracing::info;

use super::input::{load_returns, load_stocks};
use super::write_output;

/// 투자선 명령 설정.
#[derive(Debug)]
pub struct FrontierConfig {
    pub stocks: PathBuf,
    pub returns: Option<PathBuf>,
    /// 목표 수익률 개수
    pub points: usize,
    pub output: Option<PathBuf>,
}

/// 투자선을 계산해 JSON 배열로 기록합니다.
///
/// 도달할 수 없는 목표 수익률은 결과에서 빠지므로 점 개수가 `points`보다
/// 적을 수 있습니다.
pub fn frontier(
    config: FrontierConfig,
    optimizer_config: &OptimizerConfig,
) -> Result<Vec<FrontierPoint>> {
    let stocks = load_stocks(&config.stocks)?;
    let returns = config.returns.as_deref().map(load_returns).transpose()?;

    let points = SharpeOptimizer::new(optimizer_config.clone())
        .calculate_efficient_frontier(&stocks, returns.as_ref(), config.points)
        .context("Efficient frontier failed")?;

    let json = serde_json::to_string_pretty(&points).context("Failed to serialize frontier")?;
    write_output(&json, config.output.as_deref())?;

    info!(
        requested = config.points,
        solved = points.len(),
        "Frontier command finished"
    );
    Ok(points)
}
