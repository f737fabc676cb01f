//! # Kestrel Node
//!
//! Runs the transport order and peripheral dispatchers against the demo
//! plant, with simulated vehicles and loopback peripheral devices. Orders
//! and withdrawals can be entered on standard input.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod config;
mod console;
mod demo;
mod engine;
mod loopback;
mod router;
mod simulation;

use config::NodeConfig;
use engine::Engine;
use router::GraphRouter;

/// Install the global subscriber. The configured log level wins over `RUST_LOG`.
fn init_tracing(config: &NodeConfig) -> anyhow::Result<()> {
    let filter = match &config.log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = NodeConfig::from_args(std::env::args())?;
    init_tracing(&config)?;

    info!("Kestrel node starting...");

    let plant = demo::build();
    let router = Arc::new(GraphRouter::new(plant.clone()));
    let (engine, triggers) = Engine::new(plant, router, &config)?;
    let engine = Arc::new(engine);
    engine.initialize().await;

    for creation in demo::orders()? {
        engine.submit_order(creation)?;
    }

    // Start the engine background task
    let runner = tokio::spawn(engine.clone().run(triggers));
    let console = tokio::spawn(console::run(engine.clone(), console::read_stdin()));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    console.abort();
    runner.abort();
    engine.terminate().await;

    Ok(())
}
