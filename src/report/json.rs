use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::path::Path;

use crate::runner::{ScreenshotStore, SuiteReport};

/// Write the report as pretty-printed JSON (`report.json`).
pub fn write_report(report: &SuiteReport, output_dir: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    let path = output_dir.join("report.json");
    std::fs::write(&path, json)?;
    println!("    Generated JSON report: {}", path.display());
    Ok(())
}

/// Return a copy of the report with screenshot references replaced by
/// inline `data:image/png;base64,` URIs, for self-contained exports.
/// References with no matching store entry are left untouched.
pub fn embed_screenshots(report: &SuiteReport, screenshots: &ScreenshotStore) -> SuiteReport {
    let mut embedded = report.clone();
    for test in &mut embedded.tests {
        if let Some(reference) = &test.screenshot {
            if let Some(entry) = screenshots.get(reference) {
                test.screenshot = Some(format!(
                    "data:image/png;base64,{}",
                    BASE64.encode(&entry.bytes)
                ));
            }
        }
    }
    embedded
}
