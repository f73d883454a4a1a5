//! Supervisor state machine and the status snapshot shared with telemetry.

use pisat_ctrl_types::{encode_text, TelemetryPacket, TextField};

/// Text reported in place of the component list while the target is down.
pub const NOT_RUNNING: &str = "not running";

/// State of the supervised target process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupervisorState {
    #[default]
    Stopped,
    Running,
}

impl SupervisorState {
    /// Whether a start request is allowed.
    pub fn can_start(self) -> bool {
        self == Self::Stopped
    }

    /// Whether a stop request is allowed.
    pub fn can_stop(self) -> bool {
        self == Self::Running
    }

    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}

impl std::fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "Stopped"),
            Self::Running => write!(f, "Running"),
        }
    }
}

/// Point-in-time view of the daemon, published after every command.
///
/// The telemetry publisher only ever sees whole snapshots, so fields within
/// one packet are always mutually consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonStatus {
    pub valid_commands: u16,
    pub invalid_commands: u16,
    pub target: SupervisorState,
    pub current_event: TextField,
    pub loaded_components: TextField,
}

impl Default for DaemonStatus {
    fn default() -> Self {
        Self {
            valid_commands: 0,
            invalid_commands: 0,
            target: SupervisorState::Stopped,
            current_event: encode_text(""),
            loaded_components: encode_text(NOT_RUNNING),
        }
    }
}

impl DaemonStatus {
    /// Build the telemetry packet for this snapshot.
    pub fn to_packet(&self, packet_id: u16, sequence: u16) -> TelemetryPacket {
        TelemetryPacket {
            packet_id: TelemetryPacket::word(packet_id),
            sequence: TelemetryPacket::word(sequence),
            valid_commands: TelemetryPacket::word(self.valid_commands),
            invalid_commands: TelemetryPacket::word(self.invalid_commands),
            target_running: i16::from(self.target.is_running()),
            reserved: 0,
            current_event: self.current_event,
            loaded_components: self.loaded_components,
        }
    }
}

/// Valid/invalid command counters. Both saturate rather than wrap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandCounters {
    pub valid: u16,
    pub invalid: u16,
}

impl CommandCounters {
    pub fn record_valid(&mut self) {
        self.valid = self.valid.saturating_add(1);
    }

    pub fn record_invalid(&mut self) {
        self.invalid = self.invalid.saturating_add(1);
    }
}
