//! Control loop: receive command datagrams, dispatch, shut down cleanly.

use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::controller::{Controller, Disposition};
use crate::error::DaemonError;
use crate::event_log::EventLog;
use crate::host::HostControl;
use crate::state::DaemonStatus;

/// Requests a graceful shutdown of a running [`Daemon`].
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: mpsc::Sender<&'static str>,
}

impl ShutdownHandle {
    /// Ask the daemon to terminate. Has no effect once it has stopped.
    pub fn shutdown(&self, reason: &'static str) {
        let _ = self.tx.try_send(reason);
    }
}

/// The pisat-ctrl daemon.
pub struct Daemon {
    socket: UdpSocket,
    buf_size: usize,
    controller: Controller,
    shutdown_tx: mpsc::Sender<&'static str>,
    shutdown_rx: mpsc::Receiver<&'static str>,
}

impl Daemon {
    /// Bind the command socket and build the daemon.
    pub async fn bind(
        config: &Config,
        events: EventLog,
        host: Box<dyn HostControl>,
    ) -> Result<Self, DaemonError> {
        let addr = config.network.cmd_socket_addr()?;
        let socket = UdpSocket::bind(addr).await?;
        let controller = Controller::new(config, events, host)?;
        let (shutdown_tx, shutdown_rx) = mpsc::channel(4);

        info!(addr = %socket.local_addr()?, "command socket bound");
        Ok(Self {
            socket,
            buf_size: config.network.cmd_buf_size.max(1),
            controller,
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DaemonError> {
        Ok(self.socket.local_addr()?)
    }

    pub fn status_receiver(&self) -> watch::Receiver<DaemonStatus> {
        self.controller.status_receiver()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Run until the exit command, an interrupt, or a shutdown request.
    ///
    /// Returns the termination reason once the target has been stopped and
    /// telemetry told to terminate.
    pub async fn run(mut self) -> Result<&'static str, DaemonError> {
        self.spawn_signal_listener()?;
        self.controller.log_info("pisat-ctrl daemon started");

        let mut buf = vec![0u8; self.buf_size];
        let reason = loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, from)) => {
                            debug!(%from, len, "command datagram received");
                            if self.controller.dispatch(&buf[..len]).await == Disposition::Exit {
                                break "exit command";
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "command receive failed");
                        }
                    }
                }
                reason = self.shutdown_rx.recv() => {
                    break reason.unwrap_or("shutdown requested");
                }
            }
        };

        info!(reason, "daemon shutting down");
        self.controller.terminate(reason).await;
        info!("daemon shut down complete");
        Ok(reason)
    }

    fn spawn_signal_listener(&self) -> Result<(), DaemonError> {
        let handle = self.shutdown_handle();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;

            tokio::spawn(async move {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("received SIGTERM");
                        handle.shutdown("terminate signal");
                    }
                    _ = sigint.recv() => {
                        info!("received SIGINT");
                        handle.shutdown("interrupt signal");
                    }
                }
            });
        }

        #[cfg(not(unix))]
        {
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("received Ctrl+C");
                    handle.shutdown("interrupt signal");
                }
            });
        }

        Ok(())
    }
}
