//! Target reachability probe.
//!
//! A suite run against an app that has not finished booting fails every
//! check for the same boring reason. The CLI polls the base URL first so
//! reported failures mean something.

use anyhow::{bail, Context, Result};
use log::{debug, info};
use std::time::{Duration, Instant};

/// Poll `base_url` until it answers or `timeout` elapses.
///
/// Any HTTP response counts as reachable; only connection-level errors keep
/// the probe waiting.
pub async fn wait_for_target(base_url: &str, timeout: Duration) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .context("failed to build HTTP client")?;

    let deadline = Instant::now() + timeout;
    loop {
        match client.get(base_url).send().await {
            Ok(response) => {
                info!("target reachable: {} ({})", base_url, response.status());
                return Ok(());
            }
            Err(e) => {
                if Instant::now() >= deadline {
                    bail!(
                        "target {} unreachable after {:?}: {}",
                        base_url,
                        timeout,
                        e
                    );
                }
                debug!("target not ready yet: {}", e);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }
}
