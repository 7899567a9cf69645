//! 포트폴리오 최적화 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 리스크 패리티 (기본)
//! quant optimize -s data/stocks.json
//!
//! # 과거 수익률 기반 샤프 최대화 + 1천만원 배분
//! quant optimize -s data/stocks.json -r data/returns.csv -m max-sharpe --capital 10000000
//!
//! # 효율적 투자선 20개 점
//! quant frontier -s data/stocks.json -p 20 -o frontier.json
//!
//! # 방식 비교
//! quant compare -s data/stocks.json
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::error;

use quant_cli::commands::compare::{compare, CompareConfig};
use quant_cli::commands::frontier::{frontier, FrontierConfig};
use quant_cli::commands::optimize::{optimize, Method, OptimizeConfig};
use quant_cli::AppConfig;
use quant_core::init_logging;

#[derive(Parser)]
#[command(name = "quant")]
#[command(about = "Portfolio optimizer CLI - 리스크 패리티/샤프 최대화 비중 계산", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일 (TOML, 기본: config/default.toml이 있으면 사용)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 포트폴리오 비중 최적화
    Optimize {
        /// 종목 목록 JSON 파일
        #[arg(short, long)]
        stocks: PathBuf,

        /// 과거 수익률 CSV 파일 (date,<종목코드>...)
        #[arg(short, long)]
        returns: Option<PathBuf>,

        /// 최적화 방식 (risk-parity, max-sharpe, min-variance)
        #[arg(short, long, default_value = "risk-parity")]
        method: String,

        /// 결과 저장 경로 (지정하지 않으면 stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 투자 자금 (원, 예: 10000000)
        #[arg(long)]
        capital: Option<String>,
    },

    /// 효율적 투자선 계산
    Frontier {
        /// 종목 목록 JSON 파일
        #[arg(short, long)]
        stocks: PathBuf,

        /// 과거 수익률 CSV 파일
        #[arg(short, long)]
        returns: Option<PathBuf>,

        /// 목표 수익률 개수 (기본: 설정값 50)
        #[arg(short, long)]
        points: Option<usize>,

        /// 결과 저장 경로 (지정하지 않으면 stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 최적화 방식 비교 (리스크 패리티 / 샤프 최대화 / 최소 분산)
    Compare {
        /// 종목 목록 JSON 파일
        #[arg(short, long)]
        stocks: PathBuf,

        /// 과거 수익률 CSV 파일
        #[arg(short, long)]
        returns: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let app_config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(app_config.logging.clone())
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    let result = match cli.command {
        Commands::Optimize {
            stocks,
            returns,
            method,
            output,
            capital,
        } => {
            let capital = capital
                .map(|c| {
                    Decimal::from_str(&c.replace(',', ""))
                        .with_context(|| format!("Invalid capital: {}", c))
                })
                .transpose()?;

            let config = OptimizeConfig {
                stocks,
                returns,
                method: Method::parse(&method)?,
                output,
                capital,
            };
            optimize(config, &app_config.optimizer, &app_config.allocation).map(|_| ())
        }

        Commands::Frontier {
            stocks,
            returns,
            points,
            output,
        } => {
            let config = FrontierConfig {
                stocks,
                returns,
                points: points.unwrap_or(app_config.frontier.points),
                output,
            };
            frontier(config, &app_config.optimizer).map(|_| ())
        }

        Commands::Compare { stocks, returns } => {
            compare(CompareConfig { stocks, returns }, &app_config.optimizer).map(|_| ())
        }
    };

    if let Err(e) = &result {
        error!("Command failed: {:#}", e);
    }
    result
}
