pub mod demo;
pub mod playwright;
pub mod traits;

pub use demo::DemoSessionProvider;
pub use playwright::{PlaywrightConfig, PlaywrightSessionProvider};
pub use traits::{BrowserSession, PageHandle, SessionError, SessionProvider, DEFAULT_VIEWPORT};
