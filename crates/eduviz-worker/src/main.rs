//! Engine binary entry point.

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use eduviz_worker::{Engine, EngineConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("eduviz=info".parse().unwrap()))
        .init();

    info!("starting eduviz-worker");

    // Load configuration
    let config = EngineConfig::from_env();
    info!("engine config: {:?}", config);

    // Create the engine
    let mut engine = match Engine::new(config) {
        Ok(e) => e,
        Err(e) => {
            error!("failed to create engine: {}", e);
            std::process::exit(1);
        }
    };

    engine.start_cleanup_scheduler();

    // Setup signal handlers
    let shutdown_handle = tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
    });

    // This binary is an embeddable library's process wrapper: real jobs
    // arrive through `Engine::execute_job` called by a host collaborator
    // (CLI, HTTP surface, or test harness), all explicitly out of scope
    // here (spec §1). Idle until shutdown.
    shutdown_handle.await.ok();

    engine.shutdown();
    info!("engine shutdown complete");
}
