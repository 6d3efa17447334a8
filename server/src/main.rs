use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::dispatch::TickConsumer;
use server::handoff::{fifo, OverwriteSlot};
use server::ingress::{CommandIngress, TelemetryIngress};
use server::network::{IngressServer, ServerHandle};
use server::shutdown::Shutdown;
use server::stage::ConsoleStage;
use shared::{DEFAULT_COMMAND_PORT, DEFAULT_TELEMETRY_PORT};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address both servers bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port for encrypted battery telemetry
    #[arg(short, long, default_value_t = DEFAULT_TELEMETRY_PORT)]
    telemetry_port: u16,

    /// Port for encrypted command blocks
    #[arg(short, long, default_value_t = DEFAULT_COMMAND_PORT)]
    command_port: u16,

    /// Consumer ticks per second
    #[arg(short = 'r', long, default_value = "60")]
    tick_rate: u32,
}

/// Binds both servers, then runs the tick consumer until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let shutdown = Shutdown::new();

    let slot = Arc::new(OverwriteSlot::new());
    let (commands_tx, commands_rx) = fifo();
    let (log_tx, log_rx) = fifo();

    let telemetry_config = ServerConfig::telemetry()
        .with_host(args.host)
        .with_port(args.telemetry_port);
    let command_config = ServerConfig::command()
        .with_host(args.host)
        .with_port(args.command_port);

    // A bind failure is fatal for that server only; the other keeps running.
    let mut servers: Vec<ServerHandle> = Vec::new();

    let telemetry = TelemetryIngress::new(&telemetry_config, Arc::clone(&slot));
    match IngressServer::bind(&telemetry_config, telemetry, &shutdown).await {
        Ok(server) => servers.push(server.spawn()),
        Err(e) => error!("Telemetry server not started: {}", e),
    }

    let command = CommandIngress::new(&command_config, commands_tx, log_tx);
    match IngressServer::bind(&command_config, command, &shutdown).await {
        Ok(server) => servers.push(server.spawn()),
        Err(e) => error!("Command server not started: {}", e),
    }

    if servers.is_empty() {
        return Err("no ingress server could be started".into());
    }

    let consumer = TickConsumer::new(slot, commands_rx, log_rx);
    let mut stage = ConsoleStage::new();

    tokio::select! {
        _ = run_tick_loop(consumer, &mut stage, args.tick_rate) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    shutdown.trigger();
    for server in servers {
        if let Err(e) = server.join(SHUTDOWN_GRACE).await {
            error!("Server shut down with error: {}", e);
        }
    }

    info!("Last battery reading: {}", stage.battery_text());
    Ok(())
}

/// Fixed-rate consumer loop. Never returns on its own.
async fn run_tick_loop(mut consumer: TickConsumer, stage: &mut ConsoleStage, tick_rate: u32) {
    let mut interval_timer = interval(Duration::from_secs_f32(1.0 / tick_rate.max(1) as f32));
    interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval_timer.tick().await;
        consumer.tick(stage);
    }
}
