//! 최적화 방식 비교.
//!
//! 같은 입력으로 리스크 패리티, 샤프 최대화, 최소 분산을 모두 실행하고
//! 요약 지표와 종목별 비중을 표로 출력합니다.

use std::path::PathBuf;

use anyhow::Result;
use quant_core::{ReturnsTable, StockInput};
use quant_portfolio::{OptimizationRun, OptimizerConfig, RunOutcome};

use super::input::{load_returns, load_stocks};
use super::optimize::{run_method, Method};

/// 비교 명령 설정.
#[derive(Debug)]
pub struct CompareConfig {
    pub stocks: PathBuf,
    pub returns: Option<PathBuf>,
}

const METHODS: [Method; 3] = [Method::RiskParity, Method::MaxSharpe, Method::MinVariance];

/// 세 가지 방식을 실행해 표를 출력합니다.
pub fn compare(
    config: CompareConfig,
    optimizer_config: &OptimizerConfig,
) -> Result<Vec<OptimizationRun>> {
    let stocks = load_stocks(&config.stocks)?;
    let returns = config.returns.as_deref().map(load_returns).transpose()?;

    let runs = compare_runs(&stocks, returns.as_ref(), optimizer_config)?;
    println!("{}", format_table(&stocks, &runs));
    Ok(runs)
}

pub fn compare_runs(
    stocks: &[StockInput],
    returns: Option<&ReturnsTable>,
    optimizer_config: &OptimizerConfig,
) -> Result<Vec<OptimizationRun>> {
    METHODS
        .iter()
        .map(|method| run_method(*method, optimizer_config, stocks, returns))
        .collect()
}

/// 테이블 형식 출력.
pub fn format_table(stocks: &[StockInput], runs: &[OptimizationRun]) -> String {
    let mut output = String::new();

    // 요약
    output.push_str(&format!(
        "{:<24} {:<10} {:>10} {:>10} {:>8} {:>8}\n",
        "METHOD", "STATUS", "RETURN", "VOL", "SHARPE", "EFF_N"
    ));
    output.push_str(&"-".repeat(75));
    output.push('\n');

    for run in runs {
        let w = &run.weights;
        let status = match run.outcome {
            RunOutcome::Converged => "ok",
            RunOutcome::Fallback { .. } => "fallback",
        };
        output.push_str(&format!(
            "{:<24} {:<10} {:>9.2}% {:>9.2}% {:>8.3} {:>8.2}\n",
            w.optimization_method.as_str(),
            status,
            w.expected_return * 100.0,
            w.expected_volatility * 100.0,
            w.sharpe_ratio,
            w.effective_num_assets()
        ));
    }

    // 종목별 비중
    output.push('\n');
    output.push_str(&format!("{:<10} {:<16}", "CODE", "NAME"));
    for run in runs {
        output.push_str(&format!(" {:>14}", short_label(run)));
    }
    output.push('\n');
    output.push_str(&"-".repeat(27 + 15 * runs.len()));
    output.push('\n');

    for (i, stock) in stocks.iter().enumerate() {
        output.push_str(&format!(
            "{:<10} {:<16}",
            stock.stock_code,
            truncate(&stock.stock_name, 16)
        ));
        for run in runs {
            let weight = run.weights.weights.get(i).copied().unwrap_or(0.0);
            output.push_str(&format!(" {:>13.2}%", weight * 100.0));
        }
        output.push('\n');
    }

    for run in runs {
        if let RunOutcome::Fallback { reason } = &run.outcome {
            output.push_str(&format!(
                "\n! {}: {}",
                run.weights.optimization_method, reason
            ));
        }
    }

    output
}

fn short_label(run: &OptimizationRun) -> &'static str {
    match run.weights.optimization_method.as_str() {
        "risk_parity" => "RISK_PARITY",
        "max_sharpe" => "MAX_SHARPE",
        "min_variance" => "MIN_VAR",
        _ => "FALLBACK",
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
