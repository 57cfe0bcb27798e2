pub mod report;
pub mod runner;
pub mod server;
pub mod session;
pub mod suite;
pub mod utils;

// Re-export common items
pub use runner::{Orchestrator, OrchestratorError, ProgressEvent, SuiteReport, TestOutcome, TestResult};
pub use session::{DemoSessionProvider, PlaywrightSessionProvider, SessionProvider};
pub use suite::{default_suite, Suite, SuiteSpec, TestDefinition};
