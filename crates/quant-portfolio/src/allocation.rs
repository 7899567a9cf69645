//! 비중을 원화 투자 금액으로 환산.
//!
//! 금액 계산은 `rust_decimal`로 수행하며, 종목별 금액은 `rounding_unit`의
//! 배수로 내림합니다. 내림으로 남은 금액은 `cash_remainder`가 됩니다.
//!
//! 불변식: `Σ amount + cash_remainder == capital`

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{OptimizationError, OptimizationResult};
use crate::weights::PortfolioWeights;

/// 비중을 정수로 스케일링할 때의 배율 (소수점 8자리).
const WEIGHT_SCALE: i64 = 100_000_000;

/// 자금 배분 설정.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// 금액 절사 단위 (기본값: 1원)
    #[serde(default = "default_rounding_unit")]
    pub rounding_unit: Decimal,
}

fn default_rounding_unit() -> Decimal {
    Decimal::ONE
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            rounding_unit: default_rounding_unit(),
        }
    }
}

/// 종목별 배분 금액.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationLine {
    pub stock_code: String,
    pub weight: f64,
    pub amount: Decimal,
}

/// 배분 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalAllocation {
    /// 총 투자 자금
    pub capital: Decimal,
    /// 종목별 금액 (입력 순서)
    pub lines: Vec<AllocationLine>,
    /// 절사 후 남은 현금
    pub cash_remainder: Decimal,
}

impl CapitalAllocation {
    /// 배분된 금액 합계.
    pub fn invested(&self) -> Decimal {
        self.lines.iter().map(|l| l.amount).sum()
    }

    /// 특정 종목의 금액.
    pub fn amount_of(&self, code: &str) -> Option<Decimal> {
        self.lines
            .iter()
            .find(|l| l.stock_code == code)
            .map(|l| l.amount)
    }
}

/// 자금 배분기.
#[derive(Debug, Clone, Default)]
pub struct CapitalAllocator {
    config: AllocationConfig,
}

impl CapitalAllocator {
    pub fn new(config: AllocationConfig) -> Self {
        Self { config }
    }

    /// 절사 단위를 지정해 생성합니다.
    pub fn with_rounding_unit(rounding_unit: Decimal) -> Self {
        Self::new(AllocationConfig { rounding_unit })
    }

    /// 비중대로 자금을 나눕니다.
    ///
    /// 비중은 합계로 다시 정규화하므로 부동소수 오차로 합계가 1을 약간
    /// 넘어도 배분액이 자금을 초과하지 않습니다.
    pub fn allocate(
        &self,
        weights: &PortfolioWeights,
        capital: Decimal,
    ) -> OptimizationResult<CapitalAllocation> {
        if capital.is_sign_negative() {
            return Err(OptimizationError::InvalidInput(format!(
                "capital must not be negative: {}",
                capital
            )));
        }
        if self.config.rounding_unit <= Decimal::ZERO {
            return Err(OptimizationError::InvalidInput(format!(
                "rounding unit must be positive: {}",
                self.config.rounding_unit
            )));
        }
        if weights.stock_codes.len() != weights.weights.len() {
            return Err(OptimizationError::InvalidInput(format!(
                "{} stock codes for {} weights",
                weights.stock_codes.len(),
                weights.weights.len()
            )));
        }

        let scaled = weights
            .weights
            .iter()
            .map(|w| scale_weight(*w))
            .collect::<OptimizationResult<Vec<i64>>>()?;
        let total: i64 = scaled.iter().sum();

        let unit = self.config.rounding_unit;
        let lines: Vec<AllocationLine> = weights
            .stock_codes
            .iter()
            .zip(&weights.weights)
            .zip(&scaled)
            .map(|((code, weight), s)| {
                let amount = if total == 0 {
                    Decimal::ZERO
                } else {
                    let raw = capital * Decimal::from(*s) / Decimal::from(total);
                    (raw / unit).floor() * unit
                };
                AllocationLine {
                    stock_code: code.clone(),
                    weight: *weight,
                    amount,
                }
            })
            .collect();

        let invested: Decimal = lines.iter().map(|l| l.amount).sum();
        let cash_remainder = capital - invested;

        debug!(%capital, %invested, %cash_remainder, "Capital allocated");

        Ok(CapitalAllocation {
            capital,
            lines,
            cash_remainder,
        })
    }
}

/// 비중을 정수 배율로 변환합니다. 음수 또는 비유한 값은 거부합니다.
fn scale_weight(weight: f64) -> OptimizationResult<i64> {
    if !weight.is_finite() || weight < -1e-12 {
        return Err(OptimizationError::InvalidInput(format!(
            "weight must be a non-negative number: {}",
            weight
        )));
    }
    Ok((weight.max(0.0) * WEIGHT_SCALE as f64).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::OptimizationMethod;
    use rust_decimal_macros::dec;

    fn weights(codes: &[&str], w: Vec<f64>) -> PortfolioWeights {
        PortfolioWeights {
            stock_codes: codes.iter().map(|c| c.to_string()).collect(),
            weights: w,
            expected_return: 0.1,
            expected_volatility: 0.2,
            sharpe_ratio: 0.35,
            risk_contributions: vec![],
            optimization_method: OptimizationMethod::RiskParity,
        }
    }

    #[test]
    fn test_exact_split() {
        let allocation = CapitalAllocator::default()
            .allocate(&weights(&["005930", "000660"], vec![0.6, 0.4]), dec!(10_000_000))
            .unwrap();

        assert_eq!(allocation.amount_of("005930"), Some(dec!(6_000_000)));
        assert_eq!(allocation.amount_of("000660"), Some(dec!(4_000_000)));
        assert_eq!(allocation.cash_remainder, Decimal::ZERO);
    }

    #[test]
    fn test_remainder_keeps_total() {
        let allocation = CapitalAllocator::with_rounding_unit(dec!(1000))
            .allocate(
                &weights(&["A", "B", "C"], vec![1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]),
                dec!(1_000_000),
            )
            .unwrap();

        for line in &allocation.lines {
            assert_eq!(line.amount, dec!(333_000));
        }
        assert_eq!(allocation.cash_remainder, dec!(1_000));
        assert_eq!(
            allocation.invested() + allocation.cash_remainder,
            allocation.capital
        );
    }

    #[test]
    fn test_weights_slightly_above_one_do_not_overspend() {
        let allocation = CapitalAllocator::default()
            .allocate(&weights(&["A", "B"], vec![0.5 + 1e-9, 0.5 + 1e-9]), dec!(999))
            .unwrap();

        assert!(allocation.invested() <= dec!(999));
        assert!(allocation.cash_remainder >= Decimal::ZERO);
    }

    #[test]
    fn test_negative_capital_rejected() {
        let result =
            CapitalAllocator::default().allocate(&weights(&["A"], vec![1.0]), dec!(-1));
        assert!(matches!(result, Err(OptimizationError::InvalidInput(_))));
    }

    #[test]
    fn test_invalid_weight_rejected() {
        let result =
            CapitalAllocator::default().allocate(&weights(&["A", "B"], vec![f64::NAN, 1.0]), dec!(100));
        assert!(matches!(result, Err(OptimizationError::InvalidInput(_))));
    }
}
