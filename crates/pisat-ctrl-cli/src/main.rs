//! pisat-ctrl CLI: run the control daemon, send commands, watch telemetry.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use anyhow::Context;
use clap::{Parser, Subcommand};
use pisat_ctrl_daemon::host::SystemHost;
use pisat_ctrl_daemon::{setup, Config, Daemon};
use pisat_ctrl_types::{Command, TelemetryPacket};
use tokio::net::UdpSocket;

#[derive(Parser)]
#[command(
    name = "pisat-ctrl",
    about = "Command and telemetry control for a flight-software target",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the control daemon.
    Start {
        /// Path to configuration file.
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Send a single command to a running daemon.
    Send {
        /// Command name, e.g. PI_NOOP or CFS_START.
        command: String,
        /// Daemon command address (host:port).
        #[arg(short, long, default_value = "127.0.0.1:6000")]
        to: SocketAddr,
    },

    /// Print telemetry packets as they arrive.
    Monitor {
        /// Address to receive telemetry on.
        #[arg(short, long, default_value = "0.0.0.0:6001")]
        bind: SocketAddr,
        /// Stop after this many packets.
        #[arg(short = 'n', long)]
        count: Option<u64>,
    },

    /// Print the default configuration as TOML.
    DefaultConfig,
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { config } => {
            let config = setup::load_config(config.as_deref())?;
            init_tracing(&config.log.level);
            tracing::info!(
                cmd_port = config.network.cmd_port,
                tlm = %format!("{}:{}", config.network.tlm_addr, config.network.tlm_port),
                "starting pisat-ctrl daemon"
            );

            let events = setup::event_log(&config);
            let host = SystemHost::new(config.host.clone());
            let daemon = Daemon::bind(&config, events, Box::new(host)).await?;
            let reason = daemon.run().await?;
            tracing::info!(reason, "pisat-ctrl daemon exited");
        }
        Commands::Send { command, to } => {
            init_tracing("warn");
            if Command::from_name(&command).is_none() {
                tracing::warn!(%command, "not a known command, sending anyway");
            }
            let socket = UdpSocket::bind(local_bind_for(to)).await?;
            socket
                .send_to(command.as_bytes(), to)
                .await
                .with_context(|| format!("failed to send to {to}"))?;
            println!("Sent {command} to {to}");
        }
        Commands::Monitor { bind, count } => {
            init_tracing("info");
            monitor(bind, count).await?;
        }
        Commands::DefaultConfig => {
            print!("{}", toml::to_string_pretty(&Config::default())?);
        }
    }

    Ok(())
}

async fn monitor(bind: SocketAddr, count: Option<u64>) -> anyhow::Result<()> {
    let socket = UdpSocket::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    println!("Listening for telemetry on {bind}");

    let mut buf = [0u8; 2048];
    let mut received = 0u64;
    loop {
        if count.is_some_and(|n| received >= n) {
            break;
        }
        let (len, from) = socket.recv_from(&mut buf).await?;
        match TelemetryPacket::decode(&buf[..len]) {
            Ok(packet) => {
                received += 1;
                println!(
                    "[{from}] id=0x{:04X} seq={} valid={} invalid={} running={} event={:?} components={:?}",
                    packet.packet_id,
                    packet.sequence_count(),
                    packet.valid_commands,
                    packet.invalid_commands,
                    packet.target_running != 0,
                    packet.event_text(),
                    packet.components_text(),
                );
            }
            Err(e) => tracing::warn!(%from, error = %e, "ignoring malformed telemetry"),
        }
    }
    Ok(())
}

fn local_bind_for(dest: SocketAddr) -> SocketAddr {
    if dest.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    }
}
