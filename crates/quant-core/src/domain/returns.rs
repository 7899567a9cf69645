//! 과거 수익률 테이블.
//!
//! 행은 날짜, 열은 종목 코드, 값은 기간 수익률(소수)입니다.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{QuantError, QuantResult};

/// 날짜 × 종목 수익률 테이블.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawReturnsTable")]
pub struct ReturnsTable {
    dates: Vec<NaiveDate>,
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

/// 역직렬화 직후 형태 검증 전의 테이블.
#[derive(Deserialize)]
struct RawReturnsTable {
    dates: Vec<NaiveDate>,
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl TryFrom<RawReturnsTable> for ReturnsTable {
    type Error = QuantError;

    fn try_from(raw: RawReturnsTable) -> Result<Self, Self::Error> {
        Self::new(raw.dates, raw.columns, raw.rows)
    }
}

impl ReturnsTable {
    /// 형태를 검증하며 테이블을 생성합니다.
    ///
    /// 모든 행은 `columns`와 같은 길이여야 하고 `dates`와 행 수가 같아야 합니다.
    pub fn new(
        dates: Vec<NaiveDate>,
        columns: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> QuantResult<Self> {
        if dates.len() != rows.len() {
            return Err(QuantError::Data(format!(
                "{} dates but {} rows",
                dates.len(),
                rows.len()
            )));
        }

        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(QuantError::Data(format!(
                "row {} ({}) has {} values, expected {}",
                idx,
                dates[idx],
                row.len(),
                columns.len()
            )));
        }

        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(QuantError::Data(format!("duplicate column: {}", dup)));
        }

        Ok(Self {
            dates,
            columns,
            rows,
        })
    }

    /// 날짜 목록.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// 종목 코드 목록 (열 순서).
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// 관측 행 수.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 행 또는 열이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    fn column_index(&self, code: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == code)
    }

    /// 특정 종목의 수익률 열을 가져옵니다.
    pub fn column(&self, code: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(code)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }

    /// 주어진 종목 순서대로 열을 뽑아 열 우선(column-major)으로 반환합니다.
    ///
    /// 선택한 열 중 하나라도 유한하지 않은 값이 있는 날짜는 제외합니다.
    pub fn select_complete<S: AsRef<str>>(&self, codes: &[S]) -> QuantResult<Vec<Vec<f64>>> {
        let indices = codes
            .iter()
            .map(|code| {
                let code = code.as_ref();
                self.column_index(code)
                    .ok_or_else(|| QuantError::NotFound(format!("returns column {}", code)))
            })
            .collect::<QuantResult<Vec<_>>>()?;

        let mut selected = vec![Vec::with_capacity(self.rows.len()); indices.len()];
        for row in &self.rows {
            if indices.iter().all(|&i| row[i].is_finite()) {
                for (out, &i) in selected.iter_mut().zip(&indices) {
                    out.push(row[i]);
                }
            }
        }

        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn sample() -> ReturnsTable {
        ReturnsTable::new(
            vec![date(2), date(3), date(4)],
            vec!["005930".to_string(), "000660".to_string()],
            vec![vec![0.01, 0.02], vec![f64::NAN, -0.01], vec![-0.005, 0.015]],
        )
        .unwrap()
    }

    #[test]
    fn test_shape_validation() {
        let ragged = ReturnsTable::new(
            vec![date(2), date(3)],
            vec!["A".to_string(), "B".to_string()],
            vec![vec![0.01, 0.02], vec![0.01]],
        );
        assert!(matches!(ragged, Err(QuantError::Data(_))));

        let mismatched = ReturnsTable::new(vec![date(2)], vec!["A".to_string()], vec![]);
        assert!(mismatched.is_err());

        let duplicate = ReturnsTable::new(
            vec![date(2)],
            vec!["A".to_string(), "A".to_string()],
            vec![vec![0.0, 0.0]],
        );
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_column_lookup() {
        let table = sample();
        assert_eq!(table.len(), 3);
        assert!(!table.is_empty());
        assert_eq!(table.column("000660"), Some(vec![0.02, -0.01, 0.015]));
        assert_eq!(table.column("035720"), None);
    }

    #[test]
    fn test_select_complete_drops_nan_rows() {
        let table = sample();

        let both = table.select_complete(&["000660", "005930"]).unwrap();
        assert_eq!(both.len(), 2);
        assert_eq!(both[0], vec![0.02, 0.015]);
        assert_eq!(both[1], vec![0.01, -0.005]);

        // 한 종목만 고르면 다른 열의 NaN은 영향을 주지 않음
        let single = table.select_complete(&["000660"]).unwrap();
        assert_eq!(single[0].len(), 3);
    }

    #[test]
    fn test_select_missing_column() {
        let err = sample().select_complete(&["999999"]).unwrap_err();
        assert!(matches!(err, QuantError::NotFound(_)));
    }

    #[test]
    fn test_deserialize_validates_shape() {
        let json = r#"{"dates": ["2024-01-02"], "columns": ["A", "B"], "rows": [[0.01]]}"#;
        assert!(serde_json::from_str::<ReturnsTable>(json).is_err());

        let json = r#"{"dates": ["2024-01-02"], "columns": ["A"], "rows": [[0.01]]}"#;
        let table: ReturnsTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.column("A"), Some(vec![0.01]));
    }

    #[test]
    fn test_empty_table() {
        assert!(ReturnsTable::default().is_empty());
    }
}
