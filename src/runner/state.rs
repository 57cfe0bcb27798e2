use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of a single finalized test.
///
/// Running/pending states only exist as progress events while a suite is
/// live; a finalized report never contains them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    Passed,
    Failed,
}

impl TestOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, TestOutcome::Passed)
    }
}

/// Immutable result of one executed test.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub id: String,
    pub name: String,
    pub outcome: TestOutcome,
    /// Wall-clock time of the check alone, not of page setup or teardown.
    pub duration_ms: u64,
    /// Opaque reference into the screenshot store. Absent only when capture
    /// itself failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    /// Present iff the outcome is failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate report for one suite run.
///
/// Created as a shell at suite start, appended to as tests complete, then
/// finalized once. `tests` is in execution order, which equals the order of
/// the definitions the caller supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteReport {
    pub id: String,
    pub name: String,
    pub tests: Vec<TestResult>,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration_ms: Option<u64>,
}

impl SuiteReport {
    pub fn begin(name: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            tests: Vec::new(),
            start_time: Utc::now(),
            end_time: None,
            total_duration_ms: None,
        }
    }

    pub fn push(&mut self, result: TestResult) {
        self.tests.push(result);
    }

    /// Close the report: stamp the end time and recompute the total from
    /// the per-test durations. Recomputed rather than accumulated so the
    /// invariant `total == sum(durations)` cannot drift.
    pub fn finalize(&mut self) {
        self.end_time = Some(Utc::now());
        self.total_duration_ms = Some(self.tests.iter().map(|t| t.duration_ms).sum());
    }

    pub fn passed(&self) -> usize {
        self.tests.iter().filter(|t| t.outcome.is_passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.tests.len() - self.passed()
    }
}
