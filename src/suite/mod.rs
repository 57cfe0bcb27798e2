pub mod catalog;

pub use catalog::{default_suite, Assertion, SuiteSpec, TestSpec, ViewportSpec};

use anyhow::Result;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

use crate::session::PageHandle;

/// The body of one test: an opaque async operation on a page.
///
/// Implementations either complete (`Ok`) or fail with an error whose
/// display string becomes the recorded failure message. The orchestrator
/// imposes no timeout; a check that needs one must bound its own waits.
#[async_trait]
pub trait TestCheck: Send + Sync {
    async fn run(&self, page: &dyn PageHandle) -> Result<()>;
}

/// One entry of a suite: stable id, display name, and the check to run.
#[derive(Clone)]
pub struct TestDefinition {
    pub id: String,
    pub name: String,
    pub check: Arc<dyn TestCheck>,
}

impl TestDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, check: Arc<dyn TestCheck>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            check,
        }
    }
}

impl fmt::Debug for TestDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestDefinition")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An ordered set of test definitions executed as one unit.
#[derive(Debug, Clone)]
pub struct Suite {
    pub name: String,
    pub tests: Vec<TestDefinition>,
}

impl Suite {
    pub fn new(name: impl Into<String>, tests: Vec<TestDefinition>) -> Self {
        Self {
            name: name.into(),
            tests,
        }
    }
}

/// Boxed check body: a closure from a page to a boxed future.
pub type CheckFn =
    Box<dyn for<'a> Fn(&'a dyn PageHandle) -> BoxFuture<'a, Result<()>> + Send + Sync>;

/// Adapter turning a closure into a [`TestCheck`]:
/// `FnCheck::new(Box::new(|page| Box::pin(async move { ... })))`.
pub struct FnCheck {
    f: CheckFn,
}

impl FnCheck {
    pub fn new(f: CheckFn) -> Arc<Self> {
        Arc::new(Self { f })
    }
}

#[async_trait]
impl TestCheck for FnCheck {
    async fn run(&self, page: &dyn PageHandle) -> Result<()> {
        (self.f)(page).await
    }
}
