//! Periodic telemetry publisher.
//!
//! Once enabled, a background task sends one [`TelemetryPacket`] per period
//! to the configured destination. Each packet is built from the latest
//! [`DaemonStatus`] snapshot on the watch channel. The task polls its enabled
//! flag once per iteration, so termination takes effect within one period.
//!
//! [`TelemetryPacket`]: pisat_ctrl_types::TelemetryPacket

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::DaemonError;
use crate::state::DaemonStatus;

/// A running publishing loop.
struct TelemetrySession {
    enabled: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Owns the telemetry stream configuration and at most one active session.
pub struct TelemetryPublisher {
    destination: SocketAddr,
    period: Duration,
    packet_id: u16,
    status_rx: watch::Receiver<DaemonStatus>,
    session: Option<TelemetrySession>,
}

impl TelemetryPublisher {
    pub fn new(
        destination: SocketAddr,
        period: Duration,
        packet_id: u16,
        status_rx: watch::Receiver<DaemonStatus>,
    ) -> Self {
        Self {
            destination,
            period,
            packet_id,
            status_rx,
            session: None,
        }
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    /// Whether a session is active and has not been told to stop.
    pub fn is_enabled(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.enabled.load(Ordering::SeqCst))
    }

    /// Start a new publishing session.
    ///
    /// Rejected with [`DaemonError::TelemetryActive`] while a session is
    /// already enabled; the running session is left untouched.
    pub async fn enable(&mut self) -> Result<(), DaemonError> {
        if self.is_enabled() {
            return Err(DaemonError::TelemetryActive);
        }

        let bind: SocketAddr = if self.destination.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind).await?;

        let enabled = Arc::new(AtomicBool::new(true));
        let handle = tokio::spawn(publish(
            socket,
            self.destination,
            self.period,
            self.packet_id,
            self.status_rx.clone(),
            enabled.clone(),
        ));

        self.session = Some(TelemetrySession { enabled, handle });
        info!(destination = %self.destination, period = ?self.period, "telemetry enabled");
        Ok(())
    }

    /// Tell the active session to stop after its current iteration.
    pub fn terminate(&mut self) {
        if let Some(session) = &self.session {
            session.enabled.store(false, Ordering::SeqCst);
            info!("terminating telemetry");
        }
    }

    /// Wait for the most recent session's task to finish.
    pub async fn join(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.handle.await {
                warn!(error = %e, "telemetry task failed");
            }
        }
    }
}

async fn publish(
    socket: UdpSocket,
    destination: SocketAddr,
    period: Duration,
    packet_id: u16,
    status_rx: watch::Receiver<DaemonStatus>,
    enabled: Arc<AtomicBool>,
) {
    info!(%destination, "telemetry loop started");
    let mut sequence: u16 = 0;

    while enabled.load(Ordering::SeqCst) {
        sequence = sequence.wrapping_add(1);
        let packet = status_rx.borrow().to_packet(packet_id, sequence);

        match packet.encode() {
            Ok(bytes) => {
                if let Err(e) = socket.send_to(&bytes, destination).await {
                    warn!(%destination, error = %e, "failed to send telemetry");
                } else {
                    debug!(sequence, "telemetry sent");
                }
            }
            Err(e) => warn!(error = %e, "failed to encode telemetry"),
        }

        tokio::time::sleep(period).await;
    }

    info!("telemetry loop terminated");
}
