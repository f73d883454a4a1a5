//! Command dispatch and the handlers behind each command.
//!
//! The [`Controller`] owns every piece of state mutated by commands. After
//! each dispatch it publishes a fresh [`DaemonStatus`] on a watch channel,
//! which is the only way the telemetry publisher observes that state.

use pisat_ctrl_types::Command;
use tokio::sync::watch;
use tracing::debug;

use crate::config::Config;
use crate::error::DaemonError;
use crate::event_log::EventLog;
use crate::host::HostControl;
use crate::registry::CommandRegistry;
use crate::state::{CommandCounters, DaemonStatus};
use crate::supervisor::TargetSupervisor;
use crate::telemetry::TelemetryPublisher;

/// What happened to one inbound command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Known command, handler succeeded. Counted valid.
    Accepted,
    /// Known command, handler failed. Counted invalid.
    Rejected,
    /// Unknown name or undecodable payload. Counted invalid.
    Unrecognized,
    /// The exit command. Counted valid; the caller should terminate.
    Exit,
}

enum Outcome {
    Success,
    Failure,
    Exit,
}

impl From<bool> for Outcome {
    fn from(ok: bool) -> Self {
        if ok {
            Self::Success
        } else {
            Self::Failure
        }
    }
}

/// Command-side state of the daemon.
pub struct Controller {
    registry: CommandRegistry,
    counters: CommandCounters,
    events: EventLog,
    supervisor: TargetSupervisor,
    telemetry: TelemetryPublisher,
    host: Box<dyn HostControl>,
    status_tx: watch::Sender<DaemonStatus>,
}

impl Controller {
    pub fn new(
        config: &Config,
        events: EventLog,
        host: Box<dyn HostControl>,
    ) -> Result<Self, DaemonError> {
        let (status_tx, status_rx) = watch::channel(DaemonStatus::default());
        let telemetry = TelemetryPublisher::new(
            config.network.tlm_socket_addr()?,
            config.telemetry.period(),
            config.telemetry.packet_id,
            status_rx,
        );

        let controller = Self {
            registry: CommandRegistry::new(),
            counters: CommandCounters::default(),
            events,
            supervisor: TargetSupervisor::new(config.target.clone()),
            telemetry,
            host,
            status_tx,
        };
        controller.publish_status();
        Ok(controller)
    }

    pub fn status_receiver(&self) -> watch::Receiver<DaemonStatus> {
        self.status_tx.subscribe()
    }

    /// The most recently published status.
    pub fn status(&self) -> DaemonStatus {
        self.status_tx.borrow().clone()
    }

    pub fn counters(&self) -> CommandCounters {
        self.counters
    }

    pub fn supervisor(&self) -> &TargetSupervisor {
        &self.supervisor
    }

    pub fn telemetry_enabled(&self) -> bool {
        self.telemetry.is_enabled()
    }

    /// The most recent event message.
    pub fn current_event(&self) -> &str {
        self.events.current()
    }

    /// Record an event outside of command handling (startup, shutdown).
    pub fn log_info(&mut self, message: impl Into<String>) {
        self.events.info(message);
        self.publish_status();
    }

    /// Decode one command datagram and run it.
    ///
    /// Never fails: every outcome is reported through the event log and the
    /// valid/invalid counters.
    pub async fn dispatch(&mut self, payload: &[u8]) -> Disposition {
        let disposition = if let Ok(text) = std::str::from_utf8(payload) {
            self.dispatch_name(text.trim()).await
        } else {
            self.events.error(format!(
                "Received undecodable command ({} bytes)",
                payload.len()
            ));
            self.counters.record_invalid();
            Disposition::Unrecognized
        };
        self.publish_status();
        disposition
    }

    async fn dispatch_name(&mut self, name: &str) -> Disposition {
        let Some(command) = self.registry.lookup(name) else {
            self.events.error(format!("Received undefined command {name}"));
            self.counters.record_invalid();
            return Disposition::Unrecognized;
        };

        debug!(%command, "dispatching command");
        match self.execute(command).await {
            Outcome::Success => {
                self.counters.record_valid();
                Disposition::Accepted
            }
            Outcome::Failure => {
                self.counters.record_invalid();
                Disposition::Rejected
            }
            Outcome::Exit => {
                self.counters.record_valid();
                Disposition::Exit
            }
        }
    }

    async fn execute(&mut self, command: Command) -> Outcome {
        match command {
            Command::Noop => {
                self.events.info("No operation command received");
                Outcome::Success
            }
            Command::EnableTelemetry => self.enable_telemetry().await.into(),
            Command::Exit => {
                self.events.info("Received exit command");
                Outcome::Exit
            }
            Command::Halt => {
                self.events.info("Halting host");
                self.host.halt().await;
                Outcome::Success
            }
            Command::Reboot => {
                self.events.info("Rebooting host");
                self.host.reboot().await;
                Outcome::Success
            }
            Command::StartTarget => self.start_target().await.into(),
            Command::StopTarget => self.stop_target().await.into(),
        }
    }

    async fn enable_telemetry(&mut self) -> bool {
        match self.telemetry.enable().await {
            Ok(()) => {
                self.events.info(format!(
                    "Telemetry enabled, sending to {}",
                    self.telemetry.destination()
                ));
                true
            }
            Err(DaemonError::TelemetryActive) => {
                self.events
                    .error("Enable telemetry command rejected. Telemetry is already enabled.");
                false
            }
            Err(e) => {
                self.events.error(format!("Enable telemetry failed: {e}"));
                false
            }
        }
    }

    async fn start_target(&mut self) -> bool {
        match self.supervisor.start().await {
            Ok(pid) => {
                self.events.info(format!("Start cFS, pid = {pid}"));
                true
            }
            Err(DaemonError::AlreadyRunning) => {
                let pid = self.supervisor.pid().unwrap_or_default();
                self.events.error(format!(
                    "Start cFS command rejected. The cFS is already running, pid = {pid}."
                ));
                false
            }
            Err(e) => {
                self.events.error(format!("Start cFS failed: {e}"));
                false
            }
        }
    }

    async fn stop_target(&mut self) -> bool {
        if let Some(pid) = self.supervisor.pid() {
            self.events.info(format!("Stopping cFS, pid = {pid}"));
        }
        match self.supervisor.stop().await {
            Ok(pid) => {
                self.events.info(format!("Stopped cFS, pid = {pid}"));
                true
            }
            Err(DaemonError::NotRunning) => {
                self.events.error("Stop cFS command rejected. The cFS is not running.");
                false
            }
            Err(e) => {
                self.events.error(format!("Stop cFS failed: {e}"));
                false
            }
        }
    }

    /// Shut down owned activities before the daemon exits.
    ///
    /// Stops the target if it is running and tells telemetry to stop.
    pub async fn terminate(&mut self, reason: &str) {
        if self.supervisor.state().is_running() {
            self.stop_target().await;
        }
        if self.telemetry.is_enabled() {
            self.telemetry.terminate();
            self.events.info("Telemetry terminated");
        }
        self.events.info(format!("Terminating: {reason}"));
        self.publish_status();
    }

    /// Wait for the telemetry task to exit after [`Controller::terminate`].
    pub async fn join_telemetry(&mut self) {
        self.telemetry.join().await;
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(DaemonStatus {
            valid_commands: self.counters.valid,
            invalid_commands: self.counters.invalid,
            target: self.supervisor.state(),
            current_event: self.events.current_field(),
            loaded_components: self.supervisor.components_field(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pisat_ctrl_types::{decode_text, encode_text};

    use super::*;
    use crate::config::TargetConfig;
    use crate::event_log::{EventLevel, MemorySink};
    use crate::host::{HostAction, RecordingHost};
    use crate::state::{SupervisorState, NOT_RUNNING};

    struct Harness {
        controller: Controller,
        sink: MemorySink,
        host: RecordingHost,
        dir: tempfile::TempDir,
    }

    fn write_manifest(dir: &Path, content: &str) {
        std::fs::create_dir_all(dir.join("cf")).unwrap();
        std::fs::write(dir.join("cf/cfe_es_startup.scr"), content).unwrap();
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "A,..,..,CompA\nB,..,..,CompB\n!,..,..,CompC\n");

        let mut config = Config::default();
        config.network.tlm_port = 9;
        config.target = TargetConfig {
            path: dir.path().to_path_buf(),
            binary: "/bin/sleep".to_string(),
            args: vec!["30".to_string()],
            ..TargetConfig::default()
        };

        let sink = MemorySink::new();
        let host = RecordingHost::new();
        let controller = Controller::new(
            &config,
            EventLog::new(Box::new(sink.clone())),
            Box::new(host.clone()),
        )
        .unwrap();

        Harness {
            controller,
            sink,
            host,
            dir,
        }
    }

    #[tokio::test]
    async fn unknown_commands_only_count_invalid() {
        let mut h = harness();
        for (i, name) in ["FOO", "pi_noop", "CFS_STARTX", " "].iter().enumerate() {
            let before = h.controller.status();
            let disposition = h.controller.dispatch(name.as_bytes()).await;
            assert_eq!(disposition, Disposition::Unrecognized);

            let after = h.controller.status();
            assert_eq!(after.valid_commands, before.valid_commands);
            assert_eq!(after.target, before.target);
            assert_eq!(after.invalid_commands, before.invalid_commands + 1);
            assert_eq!(usize::from(after.invalid_commands), i + 1);
        }
        assert!(h
            .sink
            .messages_at(EventLevel::Error)
            .contains(&"Received undefined command FOO".to_string()));
    }

    #[tokio::test]
    async fn undecodable_payload_is_counted_invalid() {
        let mut h = harness();
        let disposition = h.controller.dispatch(&[0xff, 0xfe, 0x00]).await;
        assert_eq!(disposition, Disposition::Unrecognized);
        assert_eq!(h.controller.counters().invalid, 1);
        assert_eq!(
            h.controller.current_event(),
            "Received undecodable command (3 bytes)"
        );
    }

    #[tokio::test]
    async fn noop_counts_valid_and_sets_event() {
        let mut h = harness();
        let disposition = h.controller.dispatch(b"PI_NOOP\n").await;
        assert_eq!(disposition, Disposition::Accepted);

        let status = h.controller.status();
        assert_eq!(status.valid_commands, 1);
        assert_eq!(status.invalid_commands, 0);
        assert_eq!(
            decode_text(&status.current_event),
            "No operation command received"
        );
    }

    #[tokio::test]
    async fn start_twice_then_stop() {
        let mut h = harness();

        assert_eq!(h.controller.dispatch(b"CFS_START").await, Disposition::Accepted);
        let pid = h.controller.supervisor().pid().unwrap();
        let status = h.controller.status();
        assert_eq!(status.target, SupervisorState::Running);
        assert_eq!(status.loaded_components, encode_text("CompA, CompB"));

        assert_eq!(h.controller.dispatch(b"CFS_START").await, Disposition::Rejected);
        assert_eq!(h.controller.supervisor().pid(), Some(pid));
        assert_eq!(h.controller.status().target, SupervisorState::Running);
        assert_eq!(
            h.controller.current_event(),
            format!("Start cFS command rejected. The cFS is already running, pid = {pid}.")
        );

        assert_eq!(h.controller.dispatch(b"CFS_STOP").await, Disposition::Accepted);
        let status = h.controller.status();
        assert_eq!(status.target, SupervisorState::Stopped);
        assert_eq!(status.loaded_components, encode_text(NOT_RUNNING));
        assert_eq!(status.valid_commands, 2);
        assert_eq!(status.invalid_commands, 1);
    }

    #[tokio::test]
    async fn stop_while_stopped_is_rejected() {
        let mut h = harness();
        assert_eq!(h.controller.dispatch(b"CFS_STOP").await, Disposition::Rejected);
        let status = h.controller.status();
        assert_eq!(status.valid_commands, 0);
        assert_eq!(status.invalid_commands, 1);
        assert_eq!(status.target, SupervisorState::Stopped);
    }

    #[tokio::test]
    async fn start_with_missing_manifest_fails() {
        let mut h = harness();
        std::fs::remove_file(h.dir.path().join("cf/cfe_es_startup.scr")).unwrap();

        assert_eq!(h.controller.dispatch(b"CFS_START").await, Disposition::Rejected);
        assert_eq!(h.controller.status().target, SupervisorState::Stopped);
        assert!(h.controller.current_event().starts_with("Start cFS failed"));
    }

    #[tokio::test]
    async fn host_actions_always_succeed() {
        let mut h = harness();
        assert_eq!(h.controller.dispatch(b"PI_HALT").await, Disposition::Accepted);
        assert_eq!(h.controller.dispatch(b"PI_REBOOT").await, Disposition::Accepted);
        assert_eq!(h.host.actions(), vec![HostAction::Halt, HostAction::Reboot]);
        assert_eq!(h.controller.counters().valid, 2);
    }

    #[tokio::test]
    async fn exit_is_counted_valid() {
        let mut h = harness();
        assert_eq!(h.controller.dispatch(b"PI_CTRL_EXIT").await, Disposition::Exit);
        assert_eq!(h.controller.counters().valid, 1);
    }

    #[tokio::test]
    async fn second_telemetry_enable_is_rejected() {
        let mut h = harness();
        assert_eq!(h.controller.dispatch(b"PI_ENA_TLM").await, Disposition::Accepted);
        assert!(h.controller.telemetry_enabled());
        assert_eq!(h.controller.dispatch(b"PI_ENA_TLM").await, Disposition::Rejected);
        assert!(h.controller.telemetry_enabled());

        h.controller.terminate("test complete").await;
        assert!(!h.controller.telemetry_enabled());
        h.controller.join_telemetry().await;
    }

    #[tokio::test]
    async fn terminate_stops_running_target() {
        let mut h = harness();
        h.controller.dispatch(b"CFS_START").await;
        h.controller.terminate("interrupt signal").await;

        assert_eq!(h.controller.status().target, SupervisorState::Stopped);
        assert_eq!(h.controller.current_event(), "Terminating: interrupt signal");
    }
}
