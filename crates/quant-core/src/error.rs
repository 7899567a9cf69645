//! 퀀트 어시스턴트의 에러 타입.
//!
//! 이 모듈은 크레이트 경계를 넘나드는 공통 에러 타입을 정의합니다.
//! 최적화 알고리즘 내부 에러는 `quant-portfolio`가 별도로 정의합니다.

use thiserror::Error;

/// 공통 에러.
#[derive(Debug, Error)]
pub enum QuantError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 데이터 에러 (수익률 테이블 형태 불일치 등)
    #[error("데이터 에러: {0}")]
    Data(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 파일 입출력 에러
    #[error("입출력 에러: {0}")]
    Io(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 찾을 수 없음
    #[error("찾을 수 없음: {0}")]
    NotFound(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 공통 Result 타입.
pub type QuantResult<T> = Result<T, QuantError>;

impl QuantError {
    /// 입력 데이터를 고치면 해결되는 에러인지 확인합니다.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            QuantError::Data(_) | QuantError::InvalidInput(_) | QuantError::NotFound(_)
        )
    }
}

impl From<serde_json::Error> for QuantError {
    fn from(err: serde_json::Error) -> Self {
        QuantError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for QuantError {
    fn from(err: std::io::Error) -> Self {
        QuantError::Io(err.to_string())
    }
}
