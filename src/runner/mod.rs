pub mod cell;
pub mod events;
pub mod orchestrator;
pub mod state;
pub mod store;

pub use events::{ConsoleEventListener, ProgressBroadcaster, ProgressEvent};
pub use orchestrator::{Orchestrator, OrchestratorError, Status, Subscription};
pub use state::{SuiteReport, TestOutcome, TestResult};
pub use store::{ResultStore, Screenshot, ScreenshotStore};
