//! Fixed command registry: wire name to command.

use std::collections::HashMap;

use pisat_ctrl_types::Command;

/// Name-to-command table, built once at startup and never modified.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    entries: HashMap<&'static str, Command>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            entries: Command::ALL.iter().map(|cmd| (cmd.name(), *cmd)).collect(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Command> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
