//! Host-level actions: halt and reboot.
//!
//! Both are fire-and-forget. The request is issued and the caller continues
//! without waiting; the host may terminate the daemon before anything else
//! happens.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::HostConfig;

/// A host action request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    Halt,
    Reboot,
}

impl std::fmt::Display for HostAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Halt => write!(f, "halt"),
            Self::Reboot => write!(f, "reboot"),
        }
    }
}

/// Issues host-level power actions.
#[async_trait]
pub trait HostControl: Send + 'static {
    /// Request a halt of the host.
    async fn halt(&mut self);

    /// Request a reboot of the host.
    async fn reboot(&mut self);
}

/// Runs the configured system commands.
pub struct SystemHost {
    config: HostConfig,
}

impl SystemHost {
    pub fn new(config: HostConfig) -> Self {
        Self { config }
    }

    fn launch(action: HostAction, argv: &[String]) {
        let Some((program, args)) = argv.split_first() else {
            warn!(%action, "no command configured");
            return;
        };
        match Command::new(program).args(args).spawn() {
            Ok(child) => info!(%action, pid = ?child.id(), "host action requested"),
            Err(e) => warn!(%action, program = %program, error = %e, "failed to request host action"),
        }
    }
}

#[async_trait]
impl HostControl for SystemHost {
    async fn halt(&mut self) {
        Self::launch(HostAction::Halt, &self.config.halt_command);
    }

    async fn reboot(&mut self) {
        Self::launch(HostAction::Reboot, &self.config.reboot_command);
    }
}

/// Records requested actions instead of performing them.
///
/// Clones share the same record, so a test can keep one while the daemon
/// owns the other.
#[derive(Debug, Default, Clone)]
pub struct RecordingHost {
    actions: Arc<Mutex<Vec<HostAction>>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> Vec<HostAction> {
        self.actions.lock().map(|a| a.clone()).unwrap_or_default()
    }

    fn push(&self, action: HostAction) {
        if let Ok(mut actions) = self.actions.lock() {
            actions.push(action);
        }
    }
}

#[async_trait]
impl HostControl for RecordingHost {
    async fn halt(&mut self) {
        self.push(HostAction::Halt);
    }

    async fn reboot(&mut self) {
        self.push(HostAction::Reboot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_host_shares_record_across_clones() {
        let handle = RecordingHost::new();
        let mut host = handle.clone();
        host.reboot().await;
        host.halt().await;
        assert_eq!(handle.actions(), vec![HostAction::Reboot, HostAction::Halt]);
    }

    #[tokio::test]
    async fn system_host_tolerates_missing_programs() {
        let mut host = SystemHost::new(HostConfig {
            halt_command: vec!["/nonexistent/halt".to_string()],
            reboot_command: Vec::new(),
        });
        host.halt().await;
        host.reboot().await;
    }

    #[tokio::test]
    async fn system_host_runs_configured_command() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("rebooted");
        let mut host = SystemHost::new(HostConfig {
            halt_command: Vec::new(),
            reboot_command: vec!["touch".to_string(), marker.display().to_string()],
        });
        host.reboot().await;

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while !marker.exists() && std::time::Instant::now() < deadline {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(marker.exists());
    }
}
