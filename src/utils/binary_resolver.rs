//! Browser executable discovery.
//!
//! Resolution order: explicit env override, system PATH, then well-known
//! install locations. Returning `None` is what makes session acquisition
//! fail with "no compatible browser executable found".

use log::warn;
use std::path::PathBuf;

/// Env var that short-circuits discovery.
pub const BROWSER_PATH_ENV: &str = "SITECHECK_BROWSER_PATH";

const PATH_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
];

const COMMON_PATHS: &[&str] = &[
    // Linux - prioritize Google Chrome first
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];

/// Locate a Chromium-compatible executable.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. Explicit override
    if let Ok(value) = std::env::var(BROWSER_PATH_ENV) {
        let path = PathBuf::from(&value);
        if path.exists() {
            return Some(path);
        }
        warn!("{} points at a missing file: {}", BROWSER_PATH_ENV, value);
    }

    // 2. System PATH
    for name in PATH_CANDIDATES {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 3. Well-known install locations
    for candidate in COMMON_PATHS {
        let path = PathBuf::from(candidate);
        if path.exists() {
            return Some(path);
        }
    }

    None
}
