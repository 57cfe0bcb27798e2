//! Single-test execution cell.
//!
//! Runs exactly one definition against a fresh page: viewport reset, timed
//! check, screenshot on both outcomes, best-effort page close. Only a page
//! that cannot be opened escapes as an error; everything else is folded
//! into the returned [`TestResult`].

use chrono::Utc;
use log::warn;
use std::time::Instant;

use super::state::{TestOutcome, TestResult};
use super::store::ScreenshotStore;
use crate::session::{BrowserSession, SessionError, DEFAULT_VIEWPORT};
use crate::suite::TestDefinition;

pub async fn run_test(
    session: &dyn BrowserSession,
    definition: &TestDefinition,
    screenshots: &ScreenshotStore,
) -> Result<TestResult, SessionError> {
    // A page that cannot be opened means the shared session is gone; that
    // aborts the suite rather than producing a failed result.
    let page = session.new_page().await?;

    let mut check_error = page
        .set_viewport(DEFAULT_VIEWPORT.0, DEFAULT_VIEWPORT.1)
        .await
        .err();

    let started = Instant::now();
    if check_error.is_none() {
        check_error = definition.check.run(page.as_ref()).await.err();
    }
    let duration_ms = started.elapsed().as_millis() as u64;

    // Capture regardless of outcome. A capture failure only costs the
    // screenshot, never the verdict.
    let label = if check_error.is_none() {
        "success"
    } else {
        "failure"
    };
    let screenshot = match page.screenshot_full_page().await {
        Ok(bytes) => Some(screenshots.insert(&definition.id, label, bytes)),
        Err(e) => {
            warn!("screenshot capture failed for {}: {}", definition.id, e);
            None
        }
    };

    if let Err(e) = page.close().await {
        warn!("failed to close page for {}: {}", definition.id, e);
    }

    let (outcome, error) = match check_error {
        None => (TestOutcome::Passed, None),
        Some(e) => (TestOutcome::Failed, Some(e.to_string())),
    };

    Ok(TestResult {
        id: definition.id.clone(),
        name: definition.name.clone(),
        outcome,
        duration_ms,
        screenshot,
        error,
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::PageHandle;
    use crate::suite::FnCheck;
    use anyhow::{bail, Result};
    use async_trait::async_trait;

    struct StubSession {
        fail_screenshot: bool,
        fail_close: bool,
    }

    struct StubPage {
        fail_screenshot: bool,
        fail_close: bool,
    }

    #[async_trait]
    impl BrowserSession for StubSession {
        async fn new_page(&self) -> Result<Box<dyn PageHandle>, SessionError> {
            Ok(Box::new(StubPage {
                fail_screenshot: self.fail_screenshot,
                fail_close: self.fail_close,
            }))
        }
        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl PageHandle for StubPage {
        async fn goto(&self, _url: &str) -> Result<()> {
            Ok(())
        }
        async fn set_viewport(&self, _w: u32, _h: u32) -> Result<()> {
            Ok(())
        }
        async fn exists(&self, _selector: &str) -> Result<bool> {
            Ok(true)
        }
        async fn count(&self, _selector: &str) -> Result<usize> {
            Ok(1)
        }
        async fn inner_text(&self, _selector: &str) -> Result<String> {
            Ok(String::new())
        }
        async fn body_text(&self) -> Result<String> {
            Ok(String::new())
        }
        async fn screenshot_full_page(&self) -> Result<Vec<u8>> {
            if self.fail_screenshot {
                bail!("capture broke");
            }
            Ok(vec![0u8; 8])
        }
        async fn close(&self) -> Result<()> {
            if self.fail_close {
                bail!("close broke");
            }
            Ok(())
        }
    }

    fn definition(id: &str, failing: bool) -> TestDefinition {
        let check = FnCheck::new(Box::new(move |_page| {
            Box::pin(async move {
                if failing {
                    bail!("X not found");
                }
                Ok(())
            })
        }));
        TestDefinition::new(id, id, check)
    }

    #[tokio::test]
    async fn test_passing_check_gets_success_screenshot() {
        let session = StubSession {
            fail_screenshot: false,
            fail_close: false,
        };
        let screenshots = ScreenshotStore::new();

        let result = run_test(&session, &definition("ok", false), &screenshots)
            .await
            .unwrap();

        assert_eq!(result.outcome, TestOutcome::Passed);
        assert!(result.error.is_none());
        let key = result.screenshot.expect("screenshot present");
        assert!(key.starts_with("ok-success-"));
        assert!(screenshots.get(&key).is_some());
    }

    #[tokio::test]
    async fn test_failing_check_is_recorded_not_propagated() {
        let session = StubSession {
            fail_screenshot: false,
            fail_close: false,
        };
        let screenshots = ScreenshotStore::new();

        let result = run_test(&session, &definition("bad", true), &screenshots)
            .await
            .unwrap();

        assert_eq!(result.outcome, TestOutcome::Failed);
        assert_eq!(result.error.as_deref(), Some("X not found"));
        assert!(result
            .screenshot
            .as_deref()
            .unwrap()
            .starts_with("bad-failure-"));
    }

    #[tokio::test]
    async fn test_screenshot_failure_never_masks_outcome() {
        let session = StubSession {
            fail_screenshot: true,
            fail_close: false,
        };
        let screenshots = ScreenshotStore::new();

        let passed = run_test(&session, &definition("ok", false), &screenshots)
            .await
            .unwrap();
        assert_eq!(passed.outcome, TestOutcome::Passed);
        assert!(passed.screenshot.is_none());

        let failed = run_test(&session, &definition("bad", true), &screenshots)
            .await
            .unwrap();
        assert_eq!(failed.outcome, TestOutcome::Failed);
        assert!(failed.screenshot.is_none());
        assert_eq!(failed.error.as_deref(), Some("X not found"));
    }

    #[tokio::test]
    async fn test_page_close_failure_is_swallowed() {
        let session = StubSession {
            fail_screenshot: false,
            fail_close: true,
        };
        let screenshots = ScreenshotStore::new();

        let result = run_test(&session, &definition("ok", false), &screenshots)
            .await
            .unwrap();
        assert_eq!(result.outcome, TestOutcome::Passed);
    }
}
