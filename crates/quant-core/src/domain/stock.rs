//! 종목 입력 레코드.
//!
//! 종목 선정 단계가 포트폴리오 최적화에 넘기는 후보 종목 정보입니다.
//! 필드 이름은 하위 리포트가 읽는 JSON 계약과 동일하게 유지합니다.

use serde::{Deserialize, Serialize};

use crate::error::{QuantError, QuantResult};

/// risk_score가 0일 때의 추정 연변동성.
pub const MIN_HEURISTIC_VOLATILITY: f64 = 0.1;

/// risk_score 0→100 구간에 대응하는 변동성 폭.
pub const HEURISTIC_VOLATILITY_SPAN: f64 = 0.4;

/// 후보 종목.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockInput {
    /// 종목 코드 (예: "005930")
    pub stock_code: String,
    /// 종목명 (예: "삼성전자")
    #[serde(default)]
    pub stock_name: String,
    /// 업종
    #[serde(default)]
    pub sector: String,
    /// 리스크 점수 (0-100, 높을수록 위험)
    pub risk_score: f64,
    /// 기대수익률 (퍼센트, 12.5 = 12.5%)
    pub expected_return: f64,
}

impl StockInput {
    /// 새 종목 입력을 생성합니다.
    pub fn new(
        stock_code: impl Into<String>,
        stock_name: impl Into<String>,
        sector: impl Into<String>,
        risk_score: f64,
        expected_return: f64,
    ) -> Self {
        Self {
            stock_code: stock_code.into(),
            stock_name: stock_name.into(),
            sector: sector.into(),
            risk_score,
            expected_return,
        }
    }

    /// risk_score로 추정한 변동성 (0.1 ~ 0.5).
    pub fn volatility_estimate(&self) -> f64 {
        MIN_HEURISTIC_VOLATILITY + (self.risk_score / 100.0) * HEURISTIC_VOLATILITY_SPAN
    }

    /// 소수 단위 기대수익률 (12.5% → 0.125).
    pub fn expected_return_decimal(&self) -> f64 {
        self.expected_return / 100.0
    }

    /// 같은 업종인지 확인합니다.
    pub fn same_sector(&self, other: &StockInput) -> bool {
        self.sector == other.sector
    }

    /// 레코드 값을 검증합니다.
    pub fn validate(&self) -> QuantResult<()> {
        if self.stock_code.trim().is_empty() {
            return Err(QuantError::InvalidInput("stock_code is empty".into()));
        }

        if !self.risk_score.is_finite() || !(0.0..=100.0).contains(&self.risk_score) {
            return Err(QuantError::InvalidInput(format!(
                "{}: risk_score must be within 0-100, got {}",
                self.stock_code, self.risk_score
            )));
        }

        if !self.expected_return.is_finite() {
            return Err(QuantError::InvalidInput(format!(
                "{}: expected_return is not finite",
                self.stock_code
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samsung() -> StockInput {
        StockInput::new("005930", "삼성전자", "반도체", 50.0, 12.5)
    }

    #[test]
    fn test_volatility_estimate_range() {
        let mut stock = samsung();

        stock.risk_score = 0.0;
        assert!((stock.volatility_estimate() - 0.1).abs() < 1e-12);

        stock.risk_score = 100.0;
        assert!((stock.volatility_estimate() - 0.5).abs() < 1e-12);

        stock.risk_score = 50.0;
        assert!((stock.volatility_estimate() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_expected_return_decimal() {
        assert!((samsung().expected_return_decimal() - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_validate() {
        assert!(samsung().validate().is_ok());

        let mut bad = samsung();
        bad.risk_score = f64::NAN;
        assert!(bad.validate().is_err());

        let mut bad = samsung();
        bad.risk_score = 120.0;
        assert!(bad.validate().is_err());

        let mut bad = samsung();
        bad.expected_return = f64::INFINITY;
        assert!(bad.validate().is_err());

        let mut bad = samsung();
        bad.stock_code = "  ".to_string();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_deserialize_contract() {
        let json = r#"{
            "stock_code": "000660",
            "stock_name": "SK하이닉스",
            "sector": "반도체",
            "risk_score": 65.0,
            "expected_return": 18.0
        }"#;

        let stock: StockInput = serde_json::from_str(json).unwrap();
        assert_eq!(stock.stock_code, "000660");
        assert_eq!(stock.sector, "반도체");
        assert!(stock.same_sector(&samsung()));
    }

    #[test]
    fn test_deserialize_without_optional_fields() {
        let json = r#"{"stock_code": "035420", "risk_score": 40, "expected_return": 9.5}"#;
        let stock: StockInput = serde_json::from_str(json).unwrap();
        assert!(stock.stock_name.is_empty());
        assert!(stock.sector.is_empty());
    }
}
