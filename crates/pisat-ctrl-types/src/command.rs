//! Command names accepted on the command channel.

/// A command the daemon knows how to execute.
///
/// Commands travel as bare ASCII names; matching is exact and case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Do nothing except record that the command arrived.
    Noop,
    /// Start the periodic telemetry stream.
    EnableTelemetry,
    /// Shut the daemon down.
    Exit,
    /// Halt the host.
    Halt,
    /// Reboot the host.
    Reboot,
    /// Start the supervised flight-software process.
    StartTarget,
    /// Stop the supervised flight-software process.
    StopTarget,
}

impl Command {
    /// Every command, in registry order.
    pub const ALL: [Self; 7] = [
        Self::Noop,
        Self::EnableTelemetry,
        Self::Exit,
        Self::Halt,
        Self::Reboot,
        Self::StartTarget,
        Self::StopTarget,
    ];

    /// The on-wire name of this command.
    pub fn name(self) -> &'static str {
        match self {
            Self::Noop => "PI_NOOP",
            Self::EnableTelemetry => "PI_ENA_TLM",
            Self::Exit => "PI_CTRL_EXIT",
            Self::Halt => "PI_HALT",
            Self::Reboot => "PI_REBOOT",
            Self::StartTarget => "CFS_START",
            Self::StopTarget => "CFS_STOP",
        }
    }

    /// Look up a command by its exact on-wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.name() == name)
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
