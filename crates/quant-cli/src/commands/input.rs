//! 입력 파일 로드.
//!
//! - 종목 목록: `StockInput` 레코드의 JSON 배열
//! - 수익률: `date,<종목코드>,<종목코드>...` 헤더의 CSV, 날짜는 `YYYY-MM-DD`
//!
//! 수익률 CSV의 빈 칸이나 `NaN`은 결측치로 읽습니다.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use quant_core::{ReturnsTable, StockInput};
use tracing::info;

/// 종목 목록 JSON을 읽습니다.
pub fn load_stocks(path: &Path) -> Result<Vec<StockInput>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open stock file: {}", path.display()))?;
    let stocks = parse_stocks(file)
        .with_context(|| format!("Failed to parse stock file: {}", path.display()))?;

    info!(count = stocks.len(), path = %path.display(), "Stocks loaded");
    Ok(stocks)
}

/// 수익률 CSV를 읽습니다.
pub fn load_returns(path: &Path) -> Result<ReturnsTable> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open returns file: {}", path.display()))?;
    let table = parse_returns(file)
        .with_context(|| format!("Failed to parse returns file: {}", path.display()))?;

    info!(
        rows = table.len(),
        columns = table.columns().len(),
        path = %path.display(),
        "Returns loaded"
    );
    Ok(table)
}

pub fn parse_stocks<R: Read>(reader: R) -> Result<Vec<StockInput>> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn parse_returns<R: Read>(reader: R) -> Result<ReturnsTable> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = reader.headers().context("Missing CSV header")?.clone();
    match headers.get(0) {
        Some(first) if first.eq_ignore_ascii_case("date") => {}
        _ => bail!("First CSV column must be 'date'"),
    }
    let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut dates = Vec::new();
    let mut rows = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        // 헤더가 1행이므로 데이터는 2행부터
        let line = idx + 2;
        let record = record.with_context(|| format!("Invalid CSV record at line {}", line))?;

        let raw_date = record.get(0).unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{}' at line {}", raw_date, line))?;

        let values = record
            .iter()
            .skip(1)
            .map(|cell| parse_return(cell).with_context(|| format!("line {}", line)))
            .collect::<Result<Vec<f64>>>()?;

        dates.push(date);
        rows.push(values);
    }

    Ok(ReturnsTable::new(dates, columns, rows)?)
}

fn parse_return(cell: &str) -> Result<f64> {
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>()
        .with_context(|| format!("Invalid return value '{}'", cell))
}
