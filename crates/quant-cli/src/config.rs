//! CLI 설정 로드.
//!
//! 우선순위: 기본값 → TOML 설정 파일 → `QUANT__` 환경 변수.
//!
//! ```bash
//! QUANT__OPTIMIZER__MAX_WEIGHT=0.3 quant optimize --stocks stocks.json
//! ```

use std::path::Path;

use quant_core::LogConfig;
use quant_portfolio::{AllocationConfig, OptimizerConfig};
use serde::{Deserialize, Serialize};

/// 설정 파일을 지정하지 않았을 때 찾는 경로 (없어도 됨).
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LogConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub allocation: AllocationConfig,
    #[serde(default)]
    pub frontier: FrontierSettings,
}

/// 효율적 투자선 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FrontierSettings {
    /// 기본 점 개수 (기본값: 50)
    #[serde(default = "default_frontier_points")]
    pub points: usize,
}

fn default_frontier_points() -> usize {
    50
}

impl Default for FrontierSettings {
    fn default() -> Self {
        Self {
            points: default_frontier_points(),
        }
    }
}

impl AppConfig {
    /// 설정을 로드합니다.
    ///
    /// `path`가 주어지면 해당 파일이 반드시 있어야 하고, 없으면
    /// [`DEFAULT_CONFIG_PATH`]를 선택적으로 읽습니다.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_PATH).required(false),
        };

        let builder = config::Config::builder()
            // 파일에서 로드
            .add_source(file)
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("QUANT")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Self = builder.build()?.try_deserialize()?;
        config
            .optimizer
            .validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(config)
    }
}
