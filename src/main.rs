use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sitecheck::report;
use sitecheck::runner::{ConsoleEventListener, Orchestrator};
use sitecheck::server::{HostConfig, HostServer};
use sitecheck::session::{
    DemoSessionProvider, PlaywrightConfig, PlaywrightSessionProvider, SessionProvider,
};
use sitecheck::suite::{default_suite, Suite, SuiteSpec};
use sitecheck::utils::health;

#[derive(Parser)]
#[command(name = "sitecheck")]
#[command(version = "0.1.0")]
#[command(about = "Browser smoke-test orchestrator with live progress streaming", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the suite once and print results
    Run {
        /// Path to a YAML suite file (built-in catalog if omitted)
        #[arg(short, long)]
        suite: Option<PathBuf>,

        /// Base URL of the application under test (built-in catalog only;
        /// a suite file carries its own)
        #[arg(short, long, default_value = "http://localhost:3000")]
        base_url: String,

        /// Use the synthetic demo session provider instead of a browser
        #[arg(long, default_value = "false")]
        demo: bool,

        /// Run the browser with a visible window
        #[arg(long, default_value = "false")]
        headful: bool,

        /// Output directory for reports
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Generate JSON and JUnit reports
        #[arg(long, default_value = "false")]
        report: bool,

        /// Seconds to wait for the target to become reachable
        #[arg(long, default_value = "30")]
        wait_target: u64,
    },

    /// Serve the HTTP/WebSocket host
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Path to a YAML suite file (built-in catalog if omitted)
        #[arg(short, long)]
        suite: Option<PathBuf>,

        /// Base URL of the application under test
        #[arg(short, long, default_value = "http://localhost:3000")]
        base_url: String,

        /// Use the synthetic demo session provider instead of a browser
        #[arg(long, default_value = "false")]
        demo: bool,

        /// Run the browser with a visible window
        #[arg(long, default_value = "false")]
        headful: bool,
    },
}

/// Returns the suite plus the base URL it targets (a suite file carries
/// its own; the built-in catalog uses the flag).
fn load_suite(path: Option<&PathBuf>, base_url: &str) -> anyhow::Result<(Suite, String)> {
    match path {
        Some(path) => {
            let spec = SuiteSpec::load(path)?;
            let target = spec.base_url.clone();
            Ok((spec.into_suite(), target))
        }
        None => Ok((default_suite(base_url), base_url.to_string())),
    }
}

fn build_provider(demo: bool, headful: bool) -> Arc<dyn SessionProvider> {
    if demo {
        Arc::new(DemoSessionProvider)
    } else {
        Arc::new(PlaywrightSessionProvider::new(PlaywrightConfig {
            headless: !headful,
            executable: None,
        }))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            suite,
            base_url,
            demo,
            headful,
            output,
            report,
            wait_target,
        } => {
            let (suite, target) = load_suite(suite.as_ref(), &base_url)?;
            if !demo {
                health::wait_for_target(&target, Duration::from_secs(wait_target)).await?;
            }

            let orchestrator = Arc::new(Orchestrator::new(build_provider(demo, headful)));
            tokio::spawn(ConsoleEventListener::listen(
                orchestrator.subscribe().receiver,
            ));

            let outcome = orchestrator.run_suite(&suite).await;

            // Let the listener drain its final lines before the process ends
            tokio::time::sleep(Duration::from_millis(200)).await;

            match outcome {
                Ok(suite_report) => {
                    if report {
                        report::generate(&suite_report, &output)?;
                    }
                    if suite_report.failed() > 0 {
                        std::process::exit(1);
                    }
                    Ok(())
                }
                Err(e) => {
                    eprintln!("{} {}", "✗".red().bold(), e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Serve {
            port,
            suite,
            base_url,
            demo,
            headful,
        } => {
            let (suite, _) = load_suite(suite.as_ref(), &base_url)?;
            let orchestrator = Arc::new(Orchestrator::new(build_provider(demo, headful)));
            HostServer::new(HostConfig { port }, orchestrator, suite)
                .start()
                .await
        }
    }
}
