//! Synthetic session provider for demos and UI development.
//!
//! Selected explicitly (`--demo`), never substituted silently: acquisition
//! failures of the real provider stay fatal. Pages here answer structural
//! queries positively and text queries with a fixed placeholder, so a demo
//! run produces a realistic mix of passed and failed results without a
//! browser installed.

use anyhow::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::Rng;
use std::time::Duration;

use super::traits::{BrowserSession, PageHandle, SessionError, SessionProvider};

/// 1x1 transparent PNG used as the demo screenshot.
const DEMO_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

const DEMO_BODY_TEXT: &str = "sitecheck demo page";

pub struct DemoSessionProvider;

#[async_trait]
impl SessionProvider for DemoSessionProvider {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, SessionError> {
        Ok(Box::new(DemoSession))
    }
}

struct DemoSession;

#[async_trait]
impl BrowserSession for DemoSession {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>, SessionError> {
        Ok(Box::new(DemoPage))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

struct DemoPage;

impl DemoPage {
    /// Simulate browser work so durations look plausible in reports.
    async fn simulate_work(&self) {
        let ms = rand::thread_rng().gen_range(30..180);
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[async_trait]
impl PageHandle for DemoPage {
    async fn goto(&self, _url: &str) -> Result<()> {
        self.simulate_work().await;
        Ok(())
    }

    async fn set_viewport(&self, _width: u32, _height: u32) -> Result<()> {
        Ok(())
    }

    async fn exists(&self, _selector: &str) -> Result<bool> {
        self.simulate_work().await;
        Ok(true)
    }

    async fn count(&self, _selector: &str) -> Result<usize> {
        self.simulate_work().await;
        Ok(4)
    }

    async fn inner_text(&self, _selector: &str) -> Result<String> {
        self.simulate_work().await;
        Ok(DEMO_BODY_TEXT.to_string())
    }

    async fn body_text(&self) -> Result<String> {
        self.simulate_work().await;
        Ok(DEMO_BODY_TEXT.to_string())
    }

    async fn screenshot_full_page(&self) -> Result<Vec<u8>> {
        Ok(BASE64.decode(DEMO_PNG_BASE64)?)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_screenshot_is_valid_png() {
        use image::GenericImageView;

        let provider = DemoSessionProvider;
        let session = provider.open().await.unwrap();
        let page = session.new_page().await.unwrap();

        let bytes = page.screenshot_full_page().await.unwrap();
        let img = image::load_from_memory(&bytes).expect("demo screenshot should decode");
        assert_eq!(img.width(), 1);
        assert_eq!(img.height(), 1);
    }

    #[tokio::test]
    async fn test_demo_page_answers_queries() {
        let provider = DemoSessionProvider;
        let session = provider.open().await.unwrap();
        let page = session.new_page().await.unwrap();

        assert!(page.exists("h2").await.unwrap());
        assert_eq!(page.count("button").await.unwrap(), 4);
        assert!(page.body_text().await.unwrap().contains("demo"));
        page.close().await.unwrap();
        session.close().await.unwrap();
    }
}
