//! CLI 명령어 구현 모듈.

pub mod compare;
pub mod frontier;
pub mod input;
pub mod optimize;

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

/// 파일 또는 stdout에 출력합니다.
pub(crate) fn write_output(content: &str, output_path: Option<&Path>) -> Result<()> {
    if let Some(path) = output_path {
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        file.write_all(content.as_bytes())
            .context("Failed to write to file")?;
        info!("Output written to: {}", path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}
