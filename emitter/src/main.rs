use anyhow::Result;
use clap::{Parser, Subcommand};
use sensor_emitter::{
    parse_record, transmit, Emitter, IdleTimer, Tolerance, TransmissionQueue, QUEUE_CAPACITY,
};
use sensor_shared::{ByteOrder, SensorRecord};
use std::time::Duration;
use tokio::time::{interval, sleep_until, Instant};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Readings cycled through by `simulate`
const DEMO_READINGS: [f32; 7] = [27.0, 27.0, 27.0, 35.0, 27.0, 27.0, 28.5];

#[derive(Parser, Debug)]
#[command(name = "sensor-emitter")]
#[command(version)]
#[command(about = "Sends sensor records to a sensor listener.", long_about = None)]
struct Cli {
    /// Listener address
    #[arg(short, long, global = true, default_value = "127.0.0.1:1010")]
    server: String,

    /// Byte order of the records on the wire
    #[arg(long, global = true, default_value_t = ByteOrder::Native)]
    byte_order: ByteOrder,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send the given records in one payload
    Send {
        /// Records as DEVICE:TYPE:VALUE
        #[arg(required = true, value_parser = parse_record)]
        records: Vec<SensorRecord>,
    },
    /// Produce demo readings and transmit them like the field device does
    Simulate {
        /// Milliseconds between readings
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Send anything pending after this many idle seconds
        #[arg(long, default_value_t = 30)]
        idle_secs: u64,

        /// Stop after this many readings (runs until Ctrl-C otherwise)
        #[arg(long)]
        count: Option<usize>,

        /// Send every reading instead of only changed ones
        #[arg(long)]
        no_filter: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Send { records } => {
            let bytes = transmit(&cli.server, &records, cli.byte_order).await?;
            info!("Sent {} records ({} bytes) to {}", records.len(), bytes, cli.server);
        }
        Commands::Simulate {
            interval_ms,
            idle_secs,
            count,
            no_filter,
        } => {
            let tolerance = if no_filter { None } else { Some(Tolerance::default()) };
            let queue = TransmissionQueue::new(QUEUE_CAPACITY, tolerance);
            let mut emitter = Emitter::new(cli.server, cli.byte_order, queue);
            simulate(
                &mut emitter,
                Duration::from_millis(interval_ms),
                Duration::from_secs(idle_secs),
                count,
            )
            .await?;
        }
    }

    Ok(())
}

async fn simulate(
    emitter: &mut Emitter,
    every: Duration,
    idle: Duration,
    count: Option<usize>,
) -> Result<()> {
    let mut ticker = interval(every);
    let mut timer = IdleTimer::new(idle, Instant::now());
    let mut produced = 0usize;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let index = produced % DEMO_READINGS.len();
                let record = SensorRecord::new(index as i32, 1, DEMO_READINGS[index]);
                produced += 1;

                match emitter.submit(record).await {
                    Ok(offer) => {
                        info!("{} -> {:?}", record, offer);
                        timer.observe(&offer, Instant::now());
                    }
                    Err(e) => {
                        // The batch was drained before the send failed
                        error!("Transmission failed: {:#}", e);
                        timer.restart(Instant::now());
                    }
                }
                if count.is_some_and(|limit| produced >= limit) {
                    break;
                }
            }
            _ = sleep_until(timer.deadline()) => {
                info!("Idle timeout, sending {} pending readings", emitter.pending());
                if let Err(e) = emitter.flush().await {
                    error!("Transmission failed: {:#}", e);
                }
                timer.restart(Instant::now());
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, stopping");
                break;
            }
        }
    }

    emitter.flush().await?;
    Ok(())
}
