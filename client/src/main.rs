use clap::{Parser, Subcommand};
use client::battery::BatterySimulator;
use client::controller::{CommandSender, TelemetrySender};
use client::network::{Link, DEFAULT_RETRY_DELAY};
use client::relay::parse_prediction;
use log::{info, warn};
use shared::{DEFAULT_COMMAND_PORT, DEFAULT_TELEMETRY_PORT};
use std::net::{IpAddr, SocketAddr};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, Duration};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Visualiser host
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Seconds to wait between reconnect attempts
    #[arg(long, default_value_t = DEFAULT_RETRY_DELAY.as_secs())]
    retry_secs: u64,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Send command codes in order
    Command {
        #[arg(short, long, default_value_t = DEFAULT_COMMAND_PORT)]
        port: u16,

        /// Give up after this many connection attempts per block
        #[arg(short, long, default_value = "5")]
        attempts: u32,

        #[arg(required = true, allow_negative_numbers = true)]
        codes: Vec<i32>,
    },
    /// Send one battery reading
    Telemetry {
        #[arg(short, long, default_value_t = DEFAULT_TELEMETRY_PORT)]
        port: u16,

        #[arg(short, long)]
        voltage: f32,

        #[arg(short = 'P', long)]
        percentage: f32,
    },
    /// Stream a simulated battery
    Simulate {
        #[arg(short, long, default_value_t = DEFAULT_TELEMETRY_PORT)]
        port: u16,

        /// Milliseconds between readings
        #[arg(short, long, default_value = "1000")]
        interval_ms: u64,

        /// Stop after this many readings; runs forever when omitted
        #[arg(short, long)]
        count: Option<u64>,
    },
    /// Forward classifier predictions read from stdin as commands
    Relay {
        #[arg(short, long, default_value_t = DEFAULT_COMMAND_PORT)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let retry_delay = Duration::from_secs(args.retry_secs);
    let link = |name: &'static str, port: u16| {
        Link::new(name, SocketAddr::new(args.host, port)).with_retry_delay(retry_delay)
    };

    match args.mode {
        Mode::Command {
            port,
            attempts,
            codes,
        } => {
            let mut sender = CommandSender::new(link("command server", port).with_max_attempts(attempts));
            for code in codes {
                sender.send(code).await?;
                info!("Sent {}", shared::Command::from_code(code));
            }
            sender.close().await;
        }
        Mode::Telemetry {
            port,
            voltage,
            percentage,
        } => {
            let mut sender = TelemetrySender::new(link("telemetry server", port).with_max_attempts(5));
            sender.send(voltage, percentage).await?;
            info!("Sent battery reading {:.3}V {:.0}%", voltage, percentage);
            sender.close().await;
        }
        Mode::Simulate {
            port,
            interval_ms,
            count,
        } => {
            let mut sender = TelemetrySender::new(link("telemetry server", port));
            let mut battery = BatterySimulator::new(rand::thread_rng(), 100.0);
            let mut ticker = interval(Duration::from_millis(interval_ms.max(1)));
            let mut sent = 0u64;

            while count.map_or(true, |count| sent < count) {
                ticker.tick().await;
                let (voltage, percentage) = battery.next_reading();
                sender.send(voltage, percentage).await?;
                info!("Battery {:.3}V {:.1}%", voltage, percentage);
                sent += 1;
            }
            sender.close().await;
        }
        Mode::Relay { port } => {
            let mut sender = CommandSender::new(link("command server", port));
            let mut lines = BufReader::new(tokio::io::stdin()).lines();

            while let Some(line) = lines.next_line().await? {
                if line.trim().is_empty() {
                    continue;
                }
                match parse_prediction(&line) {
                    Ok(Some(code)) => {
                        sender.send(code).await?;
                        info!("Relayed prediction {}", code);
                    }
                    Ok(None) => warn!("Payload without prediction: {}", line),
                    Err(e) => warn!("Skipping payload: {}", e),
                }
            }
            sender.close().await;
        }
    }

    Ok(())
}
