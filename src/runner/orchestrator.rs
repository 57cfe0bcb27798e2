//! Suite orchestration: the `Idle -> Running -> Idle` state machine.
//!
//! One orchestrator instance owns the busy flag, the progress broadcaster,
//! the result slot and the screenshot store. All of them are constructed
//! once per process and shared behind `Arc<Orchestrator>`.

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::broadcast;

use super::cell;
use super::events::{ProgressBroadcaster, ProgressEvent};
use super::state::SuiteReport;
use super::store::{ResultStore, Screenshot, ScreenshotStore};
use crate::session::{BrowserSession, SessionError, SessionProvider};
use crate::suite::{Suite, TestDefinition};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Precondition violation, rejected synchronously; nothing was mutated.
    #[error("a suite is already running")]
    AlreadyRunning,

    /// Session acquisition failed before any test executed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The run machinery itself failed mid-loop; remaining tests were
    /// abandoned and no report was stored.
    #[error("suite run aborted: {0}")]
    Aborted(String),
}

/// Snapshot of orchestrator state for status endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub is_running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run_start_time: Option<DateTime<Utc>>,
}

/// Subscription handle: the synthetic attach snapshot plus the live feed.
/// Dropping the receiver unsubscribes.
pub struct Subscription {
    pub connected: ProgressEvent,
    pub receiver: broadcast::Receiver<ProgressEvent>,
}

pub struct Orchestrator {
    provider: Arc<dyn SessionProvider>,
    broadcaster: ProgressBroadcaster,
    store: ResultStore,
    screenshots: ScreenshotStore,
    busy: AtomicBool,
    last_run_start: Mutex<Option<DateTime<Utc>>>,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn SessionProvider>) -> Self {
        Self {
            provider,
            broadcaster: ProgressBroadcaster::new(),
            store: ResultStore::new(),
            screenshots: ScreenshotStore::new(),
            busy: AtomicBool::new(false),
            last_run_start: Mutex::new(None),
        }
    }

    /// Run one suite to completion.
    ///
    /// Rejects with [`OrchestratorError::AlreadyRunning`] if a run is in
    /// flight; the call never queues. The busy flag is taken with a single
    /// compare-and-swap before the first await, so two near-simultaneous
    /// calls cannot both enter. There is no mid-run cancellation: the flag
    /// clears only when the run has fully ended, on every exit path.
    pub async fn run_suite(&self, suite: &Suite) -> Result<Arc<SuiteReport>, OrchestratorError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(OrchestratorError::AlreadyRunning);
        }
        let _guard = RunGuard { busy: &self.busy };

        let mut report = SuiteReport::begin(&suite.name);
        if let Ok(mut last) = self.last_run_start.lock() {
            *last = Some(report.start_time);
        }
        info!("suite {} started ({} tests)", report.id, suite.tests.len());
        self.broadcaster.publish(ProgressEvent::SuiteStarted {
            start_time: report.start_time,
        });

        let session = match self.provider.open().await {
            Ok(session) => session,
            Err(e) => {
                error!("session acquisition failed: {}", e);
                self.broadcaster.publish(ProgressEvent::Error {
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let loop_result = self
            .execute_all(session.as_ref(), &suite.tests, &mut report)
            .await;

        // Release unconditionally; a teardown error cannot make an already
        // finished (or already failed) run fail harder.
        if let Err(e) = session.close().await {
            warn!("browser session teardown failed: {}", e);
        }

        match loop_result {
            Ok(()) => {
                report.finalize();
                info!(
                    "suite {} finished: {} passed, {} failed",
                    report.id,
                    report.passed(),
                    report.failed()
                );
                let report = Arc::new(report);
                self.store.set(report.clone());
                self.broadcaster.publish(ProgressEvent::SuiteCompleted {
                    report: (*report).clone(),
                });
                Ok(report)
            }
            Err(e) => {
                // The shared session is no longer usable; remaining tests
                // were abandoned and this attempt stores no report.
                error!("suite {} aborted: {}", report.id, e);
                self.broadcaster.publish(ProgressEvent::Error {
                    message: e.to_string(),
                });
                Err(OrchestratorError::Aborted(e.to_string()))
            }
        }
    }

    async fn execute_all(
        &self,
        session: &dyn BrowserSession,
        tests: &[TestDefinition],
        report: &mut SuiteReport,
    ) -> Result<(), SessionError> {
        for definition in tests {
            self.broadcaster.publish(ProgressEvent::TestRunning {
                id: definition.id.clone(),
                name: definition.name.clone(),
            });
            // A failed check is recorded and iteration continues; only a
            // session-level error propagates out of the cell.
            let result = cell::run_test(session, definition, &self.screenshots).await?;
            report.push(result.clone());
            self.broadcaster
                .publish(ProgressEvent::TestCompleted { result });
        }
        Ok(())
    }

    pub fn status(&self) -> Status {
        Status {
            is_running: self.busy.load(Ordering::Acquire),
            last_run_start_time: self
                .last_run_start
                .lock()
                .ok()
                .and_then(|last| *last),
        }
    }

    pub fn last_report(&self) -> Option<Arc<SuiteReport>> {
        self.store.get()
    }

    pub fn clear_last_report(&self) {
        self.store.clear();
    }

    pub fn screenshot(&self, key: &str) -> Option<Arc<Screenshot>> {
        self.screenshots.get(key)
    }

    /// Attach a live subscriber.
    ///
    /// The receiver is registered before the snapshot is composed, so no
    /// event published in between can be missed: a subscriber either sees
    /// state in the snapshot or receives the event that changed it.
    pub fn subscribe(&self) -> Subscription {
        let receiver = self.broadcaster.subscribe();
        let connected = ProgressEvent::Connected {
            is_running: self.busy.load(Ordering::Acquire),
            last_report: self.store.get().map(|r| (*r).clone()),
        };
        Subscription {
            connected,
            receiver,
        }
    }
}

/// Clears the busy flag on every exit path out of `run_suite`.
struct RunGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::state::TestOutcome;
    use crate::session::PageHandle;
    use crate::suite::FnCheck;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::time::Duration;

    struct MockProvider {
        fail_open: bool,
        fail_new_page: bool,
    }

    impl MockProvider {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                fail_open: false,
                fail_new_page: false,
            })
        }
    }

    #[async_trait]
    impl SessionProvider for MockProvider {
        async fn open(&self) -> Result<Box<dyn BrowserSession>, SessionError> {
            if self.fail_open {
                return Err(SessionError::NoBrowser);
            }
            Ok(Box::new(MockSession {
                fail_new_page: self.fail_new_page,
            }))
        }
    }

    struct MockSession {
        fail_new_page: bool,
    }

    #[async_trait]
    impl BrowserSession for MockSession {
        async fn new_page(&self) -> Result<Box<dyn PageHandle>, SessionError> {
            if self.fail_new_page {
                return Err(SessionError::NewPage("browser process died".to_string()));
            }
            Ok(Box::new(MockPage))
        }
        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    struct MockPage;

    #[async_trait]
    impl PageHandle for MockPage {
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
            Ok(vec![1u8; 4])
        }
        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    fn passing(id: &str) -> TestDefinition {
        TestDefinition::new(
            id,
            id,
            FnCheck::new(Box::new(|_page| Box::pin(async { Ok(()) }))),
        )
    }

    fn failing(id: &str, message: &str) -> TestDefinition {
        let message = message.to_string();
        TestDefinition::new(
            id,
            id,
            FnCheck::new(Box::new(move |_page| {
                let message = message.clone();
                Box::pin(async move { bail!("{}", message) })
            })),
        )
    }

    fn slow(id: &str, delay: Duration) -> TestDefinition {
        TestDefinition::new(
            id,
            id,
            FnCheck::new(Box::new(move |_page| {
                Box::pin(async move {
                    tokio::time::sleep(delay).await;
                    Ok(())
                })
            })),
        )
    }

    #[tokio::test]
    async fn test_all_passing_suite() {
        let orchestrator = Orchestrator::new(MockProvider::ok());
        let suite = Suite::new("smoke", vec![passing("a"), passing("b"), passing("c")]);

        let report = orchestrator.run_suite(&suite).await.unwrap();

        assert_eq!(report.tests.len(), 3);
        assert!(report.tests.iter().all(|t| t.outcome.is_passed()));
        assert_eq!(
            report.total_duration_ms,
            Some(report.tests.iter().map(|t| t.duration_ms).sum())
        );
        assert!(!orchestrator.status().is_running);
    }

    #[tokio::test]
    async fn test_failure_isolation_and_order() {
        let orchestrator = Orchestrator::new(MockProvider::ok());
        let suite = Suite::new(
            "smoke",
            vec![passing("a"), failing("b", "X not found"), passing("c")],
        );

        let report = orchestrator.run_suite(&suite).await.unwrap();

        assert_eq!(report.tests.len(), 3);
        let ids: Vec<_> = report.tests.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(report.tests[0].outcome, TestOutcome::Passed);
        assert_eq!(report.tests[1].outcome, TestOutcome::Failed);
        assert_eq!(report.tests[1].error.as_deref(), Some("X not found"));
        assert_eq!(report.tests[2].outcome, TestOutcome::Passed);
    }

    #[tokio::test]
    async fn test_concurrent_run_is_rejected() {
        let orchestrator = Arc::new(Orchestrator::new(MockProvider::ok()));
        let suite = Suite::new("smoke", vec![slow("a", Duration::from_millis(100))]);

        let first = {
            let orchestrator = orchestrator.clone();
            let suite = suite.clone();
            tokio::spawn(async move { orchestrator.run_suite(&suite).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = orchestrator.run_suite(&suite).await;
        assert!(matches!(second, Err(OrchestratorError::AlreadyRunning)));

        // the first run is unaffected by the rejected call
        let report = first.await.unwrap().unwrap();
        assert_eq!(report.tests.len(), 1);
        assert!(!orchestrator.status().is_running);

        // and the orchestrator accepts runs again
        let report = orchestrator.run_suite(&suite).await.unwrap();
        assert_eq!(report.tests.len(), 1);
    }

    #[tokio::test]
    async fn test_acquisition_failure_keeps_prior_report() {
        let good = Orchestrator::new(MockProvider::ok());
        let suite = Suite::new("smoke", vec![passing("a")]);
        let prior = good.run_suite(&suite).await.unwrap();

        // move the stored report into an orchestrator whose provider fails
        let bad = Orchestrator::new(Arc::new(MockProvider {
            fail_open: true,
            fail_new_page: false,
        }));
        bad.store.set(prior.clone());

        let mut rx = bad.subscribe().receiver;
        let result = bad.run_suite(&suite).await;
        assert!(matches!(
            result,
            Err(OrchestratorError::Session(SessionError::NoBrowser))
        ));

        // store unchanged, flag cleared, error event broadcast
        assert_eq!(bad.last_report().unwrap().id, prior.id);
        assert!(!bad.status().is_running);

        let mut saw_error = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, ProgressEvent::Error { .. }) {
                saw_error = true;
            }
        }
        assert!(saw_error);
    }

    #[tokio::test]
    async fn test_session_crash_aborts_without_storing() {
        let orchestrator = Orchestrator::new(Arc::new(MockProvider {
            fail_open: false,
            fail_new_page: true,
        }));
        let suite = Suite::new("smoke", vec![passing("a"), passing("b")]);

        let result = orchestrator.run_suite(&suite).await;
        assert!(matches!(result, Err(OrchestratorError::Aborted(_))));
        assert!(orchestrator.last_report().is_none());
        assert!(!orchestrator.status().is_running);
    }

    #[tokio::test]
    async fn test_mid_run_subscriber_sees_running() {
        let orchestrator = Arc::new(Orchestrator::new(MockProvider::ok()));
        let suite = Suite::new("smoke", vec![slow("a", Duration::from_millis(100))]);

        let run = {
            let orchestrator = orchestrator.clone();
            let suite = suite.clone();
            tokio::spawn(async move { orchestrator.run_suite(&suite).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let subscription = orchestrator.subscribe();
        match subscription.connected {
            ProgressEvent::Connected { is_running, .. } => assert!(is_running),
            other => panic!("expected connected snapshot, got {:?}", other),
        }

        run.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_last_report() {
        let orchestrator = Orchestrator::new(MockProvider::ok());
        let suite = Suite::new("smoke", vec![passing("a")]);
        let report = orchestrator.run_suite(&suite).await.unwrap();

        let subscription = orchestrator.subscribe();
        match subscription.connected {
            ProgressEvent::Connected {
                is_running,
                last_report,
            } => {
                assert!(!is_running);
                assert_eq!(last_report.unwrap().id, report.id);
            }
            other => panic!("expected connected snapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_event_sequence_for_a_run() {
        let orchestrator = Orchestrator::new(MockProvider::ok());
        let suite = Suite::new("smoke", vec![passing("a"), failing("b", "nope")]);

        let mut rx = orchestrator.subscribe().receiver;
        orchestrator.run_suite(&suite).await.unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(match event {
                ProgressEvent::Connected { .. } => "connected",
                ProgressEvent::SuiteStarted { .. } => "suite-started",
                ProgressEvent::TestRunning { .. } => "test-running",
                ProgressEvent::TestCompleted { .. } => "test-completed",
                ProgressEvent::SuiteCompleted { .. } => "suite-completed",
                ProgressEvent::Error { .. } => "error",
            });
        }
        assert_eq!(
            kinds,
            [
                "suite-started",
                "test-running",
                "test-completed",
                "test-running",
                "test-completed",
                "suite-completed"
            ]
        );
    }
}
