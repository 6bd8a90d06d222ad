use anyhow::Context;
use clap::Parser;
use sensor_listener::{shutdown, Cli, ConsoleSink, Listener};
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = Cli::parse().into_config();

    info!("Sensor listener starting");
    info!("  Bind: {}", config.bind_address());
    info!("  Read chunk: {} bytes", config.chunk_size);
    if config.concurrent {
        info!("  Concurrent sessions enabled");
    }

    let (trigger, shutdown) = shutdown::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                trigger.trigger();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    let listener = Listener::bind(config)
        .await
        .context("Sensor listener could not start")?;

    listener.run(Arc::new(ConsoleSink::new()), shutdown).await?;

    info!("Sensor listener stopped");
    Ok(())
}
