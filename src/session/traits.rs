use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

/// Default viewport applied to every fresh page before a check runs.
pub const DEFAULT_VIEWPORT: (u32, u32) = (1280, 720);

/// Errors raised by the browser session layer.
///
/// These are the only failures that abort a suite run: everything a check
/// does on a page stays inside the check's own `Result`.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no compatible browser executable found")]
    NoBrowser,

    #[error("browser session could not be started: {0}")]
    Open(String),

    #[error("page could not be opened: {0}")]
    NewPage(String),
}

/// Source of browser sessions.
///
/// A suite run acquires exactly one session through this trait and releases
/// it unconditionally when the run ends. Acquisition failure is fatal to the
/// run and is reported as a suite-level error, never as a per-test failure.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, SessionError>;
}

/// One live browser session, exclusively owned by the running suite.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Open a fresh isolated page. Cookies, viewport and navigation state
    /// from previous pages must not be visible here.
    async fn new_page(&self) -> Result<Box<dyn PageHandle>, SessionError>;

    /// Tear the session down. Callers log and swallow errors from this.
    async fn close(&self) -> Result<()>;
}

/// An isolated browsing context handed to a single check.
#[async_trait]
pub trait PageHandle: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;

    async fn set_viewport(&self, width: u32, height: u32) -> Result<()>;

    /// Whether at least one element matches the selector.
    async fn exists(&self, selector: &str) -> Result<bool>;

    /// Number of elements matching the selector.
    async fn count(&self, selector: &str) -> Result<usize>;

    /// Rendered text of the first element matching the selector.
    async fn inner_text(&self, selector: &str) -> Result<String>;

    /// Rendered text of the whole document body.
    async fn body_text(&self) -> Result<String>;

    /// Capture a full-page PNG of the current page state.
    async fn screenshot_full_page(&self) -> Result<Vec<u8>>;

    /// Close the page. Callers log and swallow errors from this.
    async fn close(&self) -> Result<()>;
}
