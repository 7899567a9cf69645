//! # Quant Core
//!
//! 퀀트 어시스턴트의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 종목 선정 단계에서 넘어오는 종목 입력 레코드
//! - 날짜 × 종목 형태의 과거 수익률 테이블
//! - 공통 에러 타입
//! - 로깅 인프라

pub mod domain;
pub mod error;
pub mod logging;

pub use domain::*;
pub use error::*;
pub use logging::*;
