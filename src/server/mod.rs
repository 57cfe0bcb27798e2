//! Host Web Server
//!
//! HTTP + WebSocket host exposing the orchestrator to external observers.

pub mod api;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::runner::Orchestrator;
use crate::suite::Suite;
use api::AppState;

/// Host server configuration
pub struct HostConfig {
    pub port: u16,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// HTTP/WebSocket host around one orchestrator instance.
pub struct HostServer {
    config: HostConfig,
    state: Arc<AppState>,
}

impl HostServer {
    pub fn new(config: HostConfig, orchestrator: Arc<Orchestrator>, suite: Suite) -> Self {
        Self {
            config,
            state: Arc::new(AppState {
                orchestrator,
                suite,
            }),
        }
    }

    /// Start the server and block until shutdown.
    pub async fn start(self) -> Result<()> {
        let app = api::api_router()
            .layer(CorsLayer::permissive())
            .with_state(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));

        println!("\n🧪 Test host started!");
        println!("   API: http://localhost:{}", self.config.port);
        println!("   Endpoints:");
        println!("     GET    /api/health");
        println!("     GET    /api/tests/status");
        println!("     GET    /api/tests/results");
        println!("     DELETE /api/tests/results");
        println!("     POST   /api/tests/run");
        println!("     POST   /api/tests/run/:id");
        println!("     GET    /api/tests/live (WebSocket)");
        println!("     GET    /api/screenshots/:reference");
        println!("\n   Press Ctrl+C to stop.\n");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    println!("\nShutting down...");
}
