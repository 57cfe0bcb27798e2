use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::state::{SuiteReport, TestResult};
use chrono::{DateTime, Utc};

/// Suite lifecycle events for real-time updates.
///
/// Delivered to subscribers in exact publish order. `Connected` is the
/// synthetic snapshot a subscriber receives on attach; it is never published
/// on the live channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ProgressEvent {
    Connected {
        is_running: bool,
        last_report: Option<SuiteReport>,
    },
    SuiteStarted {
        start_time: DateTime<Utc>,
    },
    TestRunning {
        id: String,
        name: String,
    },
    TestCompleted {
        result: TestResult,
    },
    SuiteCompleted {
        report: SuiteReport,
    },
    Error {
        message: String,
    },
}

/// Fan-out of progress events to live subscribers.
///
/// Fire-and-forget: publishing never blocks on consumers, a publish with no
/// subscribers is a no-op, and a lagging subscriber is dropped by the
/// channel once its buffer fills rather than back-pressuring the run.
pub struct ProgressBroadcaster {
    sender: broadcast::Sender<ProgressEvent>,
}

impl ProgressBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    pub fn publish(&self, event: ProgressEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration as StdDuration;

/// Console event listener for printing real-time updates.
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<ProgressEvent>) {
        use std::io::IsTerminal;

        // Hidden draw target when piped, to keep escape codes out of logs
        let multi = if std::io::stdout().is_terminal() {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let mut spinner: Option<ProgressBar> = None;
        let mut current: String = String::new();

        while let Ok(event) = receiver.recv().await {
            match event {
                ProgressEvent::Connected { .. } => {}

                ProgressEvent::SuiteStarted { start_time } => {
                    multi
                        .println(format!(
                            "\n{} Suite started at {}",
                            "▶".green().bold(),
                            start_time.format("%H:%M:%S").to_string().cyan()
                        ))
                        .ok();
                }

                ProgressEvent::TestRunning { id, name } => {
                    let pb = multi.add(ProgressBar::new_spinner());
                    if let Ok(style) = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("    {spinner} {msg}")
                    {
                        pb.set_style(style);
                    }
                    current = format!("[{}] {}... ", id, name.dimmed());
                    pb.set_message(current.clone());
                    pb.enable_steady_tick(StdDuration::from_millis(100));
                    spinner = Some(pb);
                }

                ProgressEvent::TestCompleted { result } => {
                    let icon = if result.outcome.is_passed() {
                        "✓".green()
                    } else {
                        "✗".red()
                    };
                    let line = format!("    {} {}({}ms)", icon, current, result.duration_ms);

                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("{}", line);
                    if let Some(error) = result.error {
                        println!("      {}", error.red());
                    }
                }

                ProgressEvent::SuiteCompleted { report } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("\n{} Suite finished: {}", "■".blue().bold(), report.name);
                    println!("  Total tests: {}", report.tests.len());
                    println!(
                        "  {} passed, {} failed",
                        report.passed().to_string().green(),
                        report.failed().to_string().red()
                    );
                    if let Some(duration) = report.total_duration_ms {
                        println!("  Duration: {}ms", duration);
                    }
                }

                ProgressEvent::Error { message } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("\n{} Suite error: {}", "✗".red().bold(), message.red());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::state::TestOutcome;

    #[test]
    fn test_event_wire_format() {
        let event = ProgressEvent::TestRunning {
            id: "page-load".to_string(),
            name: "Page load".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"test-running\""));
        assert!(json.contains("\"id\":\"page-load\""));

        let event = ProgressEvent::Connected {
            is_running: false,
            last_report: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"connected\""));
        assert!(json.contains("\"isRunning\":false"));
    }

    #[tokio::test]
    async fn test_broadcast_preserves_order() {
        let broadcaster = ProgressBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        broadcaster.publish(ProgressEvent::SuiteStarted {
            start_time: Utc::now(),
        });
        broadcaster.publish(ProgressEvent::TestRunning {
            id: "a".to_string(),
            name: "A".to_string(),
        });
        broadcaster.publish(ProgressEvent::TestCompleted {
            result: TestResult {
                id: "a".to_string(),
                name: "A".to_string(),
                outcome: TestOutcome::Passed,
                duration_ms: 5,
                screenshot: None,
                error: None,
                timestamp: Utc::now(),
            },
        });

        assert!(matches!(
            rx.recv().await.unwrap(),
            ProgressEvent::SuiteStarted { .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            ProgressEvent::TestRunning { .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            ProgressEvent::TestCompleted { .. }
        ));
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let broadcaster = ProgressBroadcaster::new();
        broadcaster.publish(ProgressEvent::Error {
            message: "nobody listening".to_string(),
        });
    }
}
