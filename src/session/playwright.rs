//! Chromium session provider backed by Playwright.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use playwright::api::{Browser, BrowserContext, Page, Viewport};
use playwright::Playwright;
use std::path::PathBuf;

use super::traits::{BrowserSession, PageHandle, SessionError, SessionProvider};
use crate::utils::binary_resolver;

/// Configuration for the Playwright-backed provider.
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub headless: bool,
    /// Browser executable. Discovered via env/PATH/known locations if unset.
    pub executable: Option<PathBuf>,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
        }
    }
}

/// Launches one headless Chromium per suite run.
pub struct PlaywrightSessionProvider {
    config: PlaywrightConfig,
}

impl PlaywrightSessionProvider {
    pub fn new(config: PlaywrightConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionProvider for PlaywrightSessionProvider {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, SessionError> {
        let executable = match self.config.executable.clone() {
            Some(path) => path,
            None => binary_resolver::find_chromium().ok_or(SessionError::NoBrowser)?,
        };
        info!("launching browser: {}", executable.display());

        let playwright = Playwright::initialize()
            .await
            .map_err(|e| SessionError::Open(e.to_string()))?;

        let chromium = playwright.chromium();
        let args: Vec<String> = [
            "--no-sandbox",
            "--disable-setuid-sandbox",
            "--disable-dev-shm-usage",
            "--disable-gpu",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let browser = chromium
            .launcher()
            .headless(self.config.headless)
            .executable(&executable)
            .args(&args)
            .launch()
            .await
            .map_err(|e| SessionError::Open(e.to_string()))?;

        Ok(Box::new(PlaywrightSession {
            _playwright: playwright,
            browser,
        }))
    }
}

/// One launched browser process plus its connection.
pub struct PlaywrightSession {
    // Keeps the driver process alive for the lifetime of the session.
    _playwright: Playwright,
    browser: Browser,
}

#[async_trait]
impl BrowserSession for PlaywrightSession {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>, SessionError> {
        // A fresh context per test: cookies and storage never leak between
        // pages from different contexts.
        let context = self
            .browser
            .context_builder()
            .build()
            .await
            .map_err(|e| SessionError::NewPage(e.to_string()))?;
        let page = context
            .new_page()
            .await
            .map_err(|e| SessionError::NewPage(e.to_string()))?;
        debug!("opened fresh browser context + page");
        Ok(Box::new(PlaywrightPage { context, page }))
    }

    async fn close(&self) -> Result<()> {
        self.browser
            .close()
            .await
            .context("failed to close browser")?;
        Ok(())
    }
}

struct PlaywrightPage {
    context: BrowserContext,
    page: Page,
}

#[async_trait]
impl PageHandle for PlaywrightPage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.page
            .goto_builder(url)
            .goto()
            .await
            .context("failed to navigate to URL")?;
        Ok(())
    }

    async fn set_viewport(&self, width: u32, height: u32) -> Result<()> {
        self.page
            .set_viewport_size(Viewport {
                width: width as i32,
                height: height as i32,
            })
            .await
            .context("failed to set viewport size")?;
        Ok(())
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        Ok(self.page.query_selector(selector).await?.is_some())
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        Ok(self.page.query_selector_all(selector).await?.len())
    }

    async fn inner_text(&self, selector: &str) -> Result<String> {
        let text: String = self
            .page
            .evaluate_on_selector::<String, String>(
                selector,
                "el => el.innerText || el.textContent || ''",
                None::<String>,
            )
            .await
            .context("failed to read element text")?;
        Ok(text)
    }

    async fn body_text(&self) -> Result<String> {
        let text: String = self
            .page
            .evaluate::<(), String>("() => document.body.innerText", ())
            .await
            .context("failed to read body text")?;
        Ok(text)
    }

    async fn screenshot_full_page(&self) -> Result<Vec<u8>> {
        let bytes = self
            .page
            .screenshot_builder()
            .r#type(playwright::api::ScreenshotType::Png)
            .full_page(true)
            .screenshot()
            .await
            .context("screenshot capture failed")?;
        Ok(bytes)
    }

    async fn close(&self) -> Result<()> {
        // Closing the context closes its pages with it.
        self.context
            .close()
            .await
            .context("failed to close browser context")?;
        Ok(())
    }
}
