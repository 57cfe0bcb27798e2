pub mod json;
pub mod junit;

use anyhow::Result;
use std::path::Path;

use crate::runner::SuiteReport;

/// Write all report formats for a completed run into `output_dir`.
pub fn generate(report: &SuiteReport, output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;
    json::write_report(report, output_dir)?;
    junit::write_report(report, output_dir)?;
    Ok(())
}
