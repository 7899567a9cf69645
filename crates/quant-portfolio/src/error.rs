//! 포트폴리오 최적화 에러 타입.

use quant_core::QuantError;
use thiserror::Error;

/// 최적화 과정에서 발생할 수 있는 에러.
#[derive(Debug, Error)]
pub enum OptimizationError {
    /// 종목이 하나도 없음
    #[error("Empty universe: at least one stock is required")]
    EmptyUniverse,

    /// 유효하지 않은 입력 레코드
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 수익률 테이블에 필요한 종목 열이 없음
    #[error("Missing returns: {0}")]
    MissingReturns(String),

    /// 추정을 위한 관측치 부족
    #[error("Insufficient data: need {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// 수치 불안정 (0 분산, NaN 등)
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    /// 솔버가 반복 한도 안에 수렴하지 못함
    #[error("Solver did not converge within {iterations} iterations")]
    NotConverged { iterations: usize },

    /// 최적화 설정 오류
    #[error("Invalid optimizer config: {0}")]
    InvalidConfig(String),
}

/// 최적화 작업을 위한 Result 타입.
pub type OptimizationResult<T> = Result<T, OptimizationError>;

impl OptimizationError {
    /// 호출자에게 그대로 전파해야 하는 에러인지 확인.
    ///
    /// 나머지 에러는 모두 균등가중 대체 결과로 흡수됩니다.
    pub fn is_hard_failure(&self) -> bool {
        matches!(
            self,
            OptimizationError::EmptyUniverse | OptimizationError::InvalidConfig(_)
        )
    }

    /// 입력은 정상이지만 수치 계산이 실패한 경우인지 확인.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            OptimizationError::NotConverged { .. } | OptimizationError::NumericalInstability(_)
        )
    }
}

impl From<QuantError> for OptimizationError {
    fn from(err: QuantError) -> Self {
        match err {
            QuantError::NotFound(what) => OptimizationError::MissingReturns(what),
            other => OptimizationError::InvalidInput(other.to_string()),
        }
    }
}
