//! 공분산 행렬 추정.
//!
//! 최적화기는 [`CovarianceEstimator`] 전략을 통해 공분산을 얻습니다.
//!
//! - [`SectorHeuristicEstimator`]: risk_score → 변동성, 업종 → 상관계수
//! - [`SampleCovarianceEstimator`]: 과거 수익률의 표본 변동성/상관계수
//! - [`DefaultCovarianceEstimator`]: 수익률이 있으면 표본, 없으면 휴리스틱
//! - [`ShrinkageEstimator`]: 표본 상관계수를 업종 휴리스틱 쪽으로 축소
//!
//! 어느 경우든 공분산은 `outer(vol, vol) ⊙ corr`로 조립합니다.

use quant_core::{ReturnsTable, StockInput};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{OptimizationError, OptimizationResult};
use crate::linalg::{dot, pearson_correlation, sample_std};

/// N×N 대칭 공분산 행렬.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovarianceMatrix {
    data: Vec<Vec<f64>>,
}

impl CovarianceMatrix {
    /// 변동성 벡터와 상관행렬로 공분산을 조립합니다.
    pub fn from_parts(volatilities: &[f64], correlation: &[Vec<f64>]) -> OptimizationResult<Self> {
        let n = volatilities.len();
        if correlation.len() != n || correlation.iter().any(|row| row.len() != n) {
            return Err(OptimizationError::InvalidInput(format!(
                "correlation matrix must be {}x{}",
                n, n
            )));
        }

        if let Some(v) = volatilities.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(OptimizationError::NumericalInstability(format!(
                "invalid volatility {}",
                v
            )));
        }

        let data = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        let rho = if i == j {
                            1.0
                        } else {
                            correlation[i][j].clamp(-1.0, 1.0)
                        };
                        volatilities[i] * volatilities[j] * rho
                    })
                    .collect()
            })
            .collect();

        Ok(Self { data })
    }

    /// 이미 계산된 행렬을 그대로 감쌉니다 (정방/대칭/유한성 검사).
    pub fn from_matrix(data: Vec<Vec<f64>>) -> OptimizationResult<Self> {
        let n = data.len();
        if data.iter().any(|row| row.len() != n) {
            return Err(OptimizationError::InvalidInput(
                "covariance matrix must be square".into(),
            ));
        }
        if data.iter().flatten().any(|v| !v.is_finite()) {
            return Err(OptimizationError::NumericalInstability(
                "covariance matrix contains non-finite values".into(),
            ));
        }
        let matrix = Self { data };
        if !matrix.is_symmetric(1e-12) {
            return Err(OptimizationError::InvalidInput(
                "covariance matrix must be symmetric".into(),
            ));
        }
        Ok(matrix)
    }

    /// 차원 N.
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    /// (i, j) 원소.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i][j]
    }

    /// 행 단위 원소 접근.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.data
    }

    /// 대각 원소의 제곱근 (자산별 변동성).
    pub fn volatilities(&self) -> Vec<f64> {
        (0..self.dim()).map(|i| self.data[i][i].max(0.0).sqrt()).collect()
    }

    /// 상관계수 (i, j). 어느 한쪽 분산이 0이면 0.
    pub fn correlation(&self, i: usize, j: usize) -> f64 {
        let denom = (self.data[i][i] * self.data[j][j]).sqrt();
        if denom <= 0.0 {
            0.0
        } else {
            self.data[i][j] / denom
        }
    }

    /// Σw.
    pub fn mul_vec(&self, w: &[f64]) -> Vec<f64> {
        self.data.iter().map(|row| dot(row, w)).collect()
    }

    /// 포트폴리오 분산 wᵀΣw.
    pub fn variance(&self, w: &[f64]) -> f64 {
        dot(w, &self.mul_vec(w))
    }

    /// 대칭 여부.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        let n = self.dim();
        (0..n).all(|i| (i + 1..n).all(|j| (self.data[i][j] - self.data[j][i]).abs() <= tol))
    }
}

/// 공분산 추정 전략.
pub trait CovarianceEstimator: Send + Sync {
    /// 종목 순서대로 N×N 공분산을 추정합니다.
    fn estimate(
        &self,
        stocks: &[StockInput],
        returns: Option<&ReturnsTable>,
    ) -> OptimizationResult<CovarianceMatrix>;

    /// 로그용 이름.
    fn name(&self) -> &'static str;
}

/// 업종 기반 휴리스틱 추정기.
///
/// 변동성은 `0.1 + risk_score/100 × 0.4`, 상관계수는 같은 업종이면
/// `same_sector_correlation`, 다르면 `cross_sector_correlation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorHeuristicEstimator {
    pub same_sector_correlation: f64,
    pub cross_sector_correlation: f64,
}

impl Default for SectorHeuristicEstimator {
    fn default() -> Self {
        Self {
            same_sector_correlation: 0.6,
            cross_sector_correlation: 0.3,
        }
    }
}

impl SectorHeuristicEstimator {
    /// 업종 버킷 상관행렬.
    pub fn correlation_matrix(&self, stocks: &[StockInput]) -> Vec<Vec<f64>> {
        stocks
            .iter()
            .enumerate()
            .map(|(i, a)| {
                stocks
                    .iter()
                    .enumerate()
                    .map(|(j, b)| {
                        if i == j {
                            1.0
                        } else if a.same_sector(b) {
                            self.same_sector_correlation
                        } else {
                            self.cross_sector_correlation
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

impl CovarianceEstimator for SectorHeuristicEstimator {
    fn estimate(
        &self,
        stocks: &[StockInput],
        _returns: Option<&ReturnsTable>,
    ) -> OptimizationResult<CovarianceMatrix> {
        let volatilities: Vec<f64> = stocks.iter().map(StockInput::volatility_estimate).collect();
        CovarianceMatrix::from_parts(&volatilities, &self.correlation_matrix(stocks))
    }

    fn name(&self) -> &'static str {
        "sector_heuristic"
    }
}

/// 과거 수익률 기반 표본 추정기.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleCovarianceEstimator {
    /// 필요한 최소 관측 수 (기본값: 2)
    pub min_observations: usize,
}

impl Default for SampleCovarianceEstimator {
    fn default() -> Self {
        Self {
            min_observations: 2,
        }
    }
}

impl SampleCovarianceEstimator {
    /// 표본 변동성과 표본 상관행렬을 계산합니다.
    pub fn sample_moments(
        &self,
        stocks: &[StockInput],
        returns: &ReturnsTable,
    ) -> OptimizationResult<(Vec<f64>, Vec<Vec<f64>>)> {
        let codes: Vec<&str> = stocks.iter().map(|s| s.stock_code.as_str()).collect();
        let columns = returns.select_complete(&codes)?;

        let observations = columns.first().map(Vec::len).unwrap_or(0);
        let required = self.min_observations.max(2);
        if observations < required {
            return Err(OptimizationError::InsufficientData {
                required,
                actual: observations,
            });
        }

        let volatilities = columns
            .iter()
            .zip(&codes)
            .map(|(col, code)| match sample_std(col) {
                Some(std) if std > 0.0 => Ok(std),
                _ => Err(OptimizationError::NumericalInstability(format!(
                    "{} has zero return variance",
                    code
                ))),
            })
            .collect::<OptimizationResult<Vec<f64>>>()?;

        let n = columns.len();
        let mut correlation = vec![vec![0.0; n]; n];
        for i in 0..n {
            correlation[i][i] = 1.0;
            for j in (i + 1)..n {
                // 분산이 0인 열은 위에서 걸러지므로 None은 길이 불일치뿐
                let rho = pearson_correlation(&columns[i], &columns[j]).unwrap_or(0.0);
                correlation[i][j] = rho;
                correlation[j][i] = rho;
            }
        }

        Ok((volatilities, correlation))
    }
}

impl CovarianceEstimator for SampleCovarianceEstimator {
    fn estimate(
        &self,
        stocks: &[StockInput],
        returns: Option<&ReturnsTable>,
    ) -> OptimizationResult<CovarianceMatrix> {
        let returns = returns.ok_or_else(|| {
            OptimizationError::MissingReturns("sample estimator requires returns".into())
        })?;
        let (volatilities, correlation) = self.sample_moments(stocks, returns)?;
        CovarianceMatrix::from_parts(&volatilities, &correlation)
    }

    fn name(&self) -> &'static str {
        "sample"
    }
}

/// 수익률 데이터 유무에 따라 표본/휴리스틱을 고르는 기본 추정기.
#[derive(Debug, Clone, Default)]
pub struct DefaultCovarianceEstimator {
    pub heuristic: SectorHeuristicEstimator,
    pub sample: SampleCovarianceEstimator,
}

impl CovarianceEstimator for DefaultCovarianceEstimator {
    fn estimate(
        &self,
        stocks: &[StockInput],
        returns: Option<&ReturnsTable>,
    ) -> OptimizationResult<CovarianceMatrix> {
        match returns {
            Some(table) if !table.is_empty() => {
                debug!(observations = table.len(), "Estimating covariance from returns");
                self.sample.estimate(stocks, Some(table))
            }
            _ => self.heuristic.estimate(stocks, None),
        }
    }

    fn name(&self) -> &'static str {
        "default"
    }
}

/// 표본 상관계수를 업종 휴리스틱 상관계수 쪽으로 축소하는 추정기.
///
/// `corr = (1 - intensity) × sample + intensity × heuristic`.
/// 수익률이 없으면 휴리스틱만 사용합니다.
#[derive(Debug, Clone)]
pub struct ShrinkageEstimator {
    /// 축소 강도 (0 = 표본 그대로, 1 = 휴리스틱 그대로)
    pub intensity: f64,
    pub target: SectorHeuristicEstimator,
    pub sample: SampleCovarianceEstimator,
}

impl ShrinkageEstimator {
    /// 주어진 축소 강도로 생성합니다. 강도는 [0, 1]로 잘립니다.
    pub fn new(intensity: f64) -> Self {
        Self {
            intensity: intensity.clamp(0.0, 1.0),
            target: SectorHeuristicEstimator::default(),
            sample: SampleCovarianceEstimator::default(),
        }
    }
}

impl Default for ShrinkageEstimator {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl CovarianceEstimator for ShrinkageEstimator {
    fn estimate(
        &self,
        stocks: &[StockInput],
        returns: Option<&ReturnsTable>,
    ) -> OptimizationResult<CovarianceMatrix> {
        let table = match returns {
            Some(table) if !table.is_empty() => table,
            _ => return self.target.estimate(stocks, None),
        };

        let (volatilities, sample_corr) = self.sample.sample_moments(stocks, table)?;
        let target_corr = self.target.correlation_matrix(stocks);
        let delta = self.intensity;

        let blended: Vec<Vec<f64>> = sample_corr
            .iter()
            .zip(&target_corr)
            .map(|(s_row, t_row)| {
                s_row
                    .iter()
                    .zip(t_row)
                    .map(|(s, t)| (1.0 - delta) * s + delta * t)
                    .collect()
            })
            .collect();

        CovarianceMatrix::from_parts(&volatilities, &blended)
    }

    fn name(&self) -> &'static str {
        "shrinkage"
    }
}
