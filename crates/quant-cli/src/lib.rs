//! 포트폴리오 최적화 CLI 도구 모음.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 종목 JSON / 수익률 CSV 입력 로드
//! - 최적화 실행 및 원화 자금 배분
//! - 효율적 투자선 계산
//! - 최적화 방식 비교 표
//! - 설정 관리

pub mod commands;
pub mod config;

pub use config::AppConfig;
