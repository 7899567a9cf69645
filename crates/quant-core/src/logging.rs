//! tracing 기반 로깅 인프라.
//!
//! 출력 형식은 세 가지를 지원합니다:
//! - **pretty**: 개발용 여러 줄 형식
//! - **json**: 배치 작업 로그 수집용 JSON 형식
//! - **compact**: 한 줄 요약 형식
//!
//! 로그는 항상 stderr로 나갑니다. stdout은 최적화 결과 JSON 전용입니다.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unsupported log format '{}'", other)),
        }
    }
}

/// 로깅 설정. 설정 파일의 `[logging]` 섹션에 대응합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// 로그 레벨 필터 (예: "info", "quant_portfolio=debug")
    pub level: String,
    pub format: LogFormat,
    /// span 진입/종료 이벤트 출력
    pub span_events: bool,
    /// 파일명과 줄 번호 출력
    pub file_location: bool,
    /// 모듈 경로 출력
    pub target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::default(),
            span_events: false,
            file_location: false,
            target: true,
        }
    }
}

impl LogConfig {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// 최적화 span의 시작/종료를 함께 기록합니다.
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    fn layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let span_events = if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_file(self.file_location)
            .with_line_number(self.file_location)
            .with_target(self.target)
            .with_span_events(span_events);

        match self.format {
            LogFormat::Pretty => layer.pretty().boxed(),
            LogFormat::Json => layer.json().boxed(),
            LogFormat::Compact => layer.compact().boxed(),
        }
    }
}

/// 로깅 시스템을 초기화합니다.
///
/// `RUST_LOG`가 있으면 `config.level`보다 우선합니다. 두 번째 호출은 에러입니다.
///
/// ```no_run
/// use quant_core::logging::{init_logging, LogConfig, LogFormat};
///
/// init_logging(LogConfig::new("debug").with_format(LogFormat::Json)).ok();
/// ```
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)?,
    };

    tracing_subscriber::registry()
        .with(config.layer())
        .with(filter)
        .try_init()?;

    tracing::debug!(level = %config.level, format = ?config.format, "Logging ready");
    Ok(())
}

/// 최적화 실행 컨텍스트 필드가 포함된 span을 생성하는 매크로.
#[macro_export]
macro_rules! portfolio_span {
    ($name:expr, $method:expr) => {
        tracing::info_span!($name, method = %$method)
    };
    ($name:expr, $method:expr, $universe:expr) => {
        tracing::info_span!($name, method = %$method, universe = $universe)
    };
}
