//! Lifecycle of the single supervised flight-software process.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use pisat_ctrl_types::{encode_text, TextField};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::config::TargetConfig;
use crate::error::DaemonError;
use crate::manifest;
use crate::state::{SupervisorState, NOT_RUNNING};

/// Starts, stops and tracks the supervised target process.
pub struct TargetSupervisor {
    config: TargetConfig,
    state: SupervisorState,
    child: Option<Child>,
    pid: Option<u32>,
    components: String,
}

impl TargetSupervisor {
    pub fn new(config: TargetConfig) -> Self {
        Self {
            config,
            state: SupervisorState::Stopped,
            child: None,
            pid: None,
            components: NOT_RUNNING.to_string(),
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Components loaded by the target, or the not-running text.
    pub fn components(&self) -> &str {
        &self.components
    }

    pub fn components_field(&self) -> TextField {
        encode_text(&self.components)
    }

    /// Start the target. Returns the new process id.
    ///
    /// Fails without changing state if the target is already running, the
    /// manifest cannot be read, or the binary cannot be spawned.
    pub async fn start(&mut self) -> Result<u32, DaemonError> {
        if !self.state.can_start() {
            return Err(DaemonError::AlreadyRunning);
        }

        let manifest_path = self.config.manifest_path();
        let components = manifest::read_component_summary(&manifest_path)?;
        debug!(manifest = %manifest_path.display(), %components, "read startup manifest");

        let binary = resolve_binary(&self.config.path, &self.config.binary);
        let child = Command::new(&binary)
            .args(&self.config.args)
            .current_dir(&self.config.path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DaemonError::Spawn {
                binary: binary.display().to_string(),
                source,
            })?;

        // A child that has already been reaped has no id; report it as 0.
        let pid = child.id().unwrap_or_default();
        info!(pid, binary = %binary.display(), "target started");

        self.child = Some(child);
        self.pid = Some(pid);
        self.components = components;
        self.state = SupervisorState::Running;
        Ok(pid)
    }

    /// Kill the target and wait for it to be reaped. Returns the old pid.
    ///
    /// There is no timeout: a child that cannot be reaped blocks the caller.
    pub async fn stop(&mut self) -> Result<u32, DaemonError> {
        if !self.state.can_stop() {
            return Err(DaemonError::NotRunning);
        }

        self.components = NOT_RUNNING.to_string();
        let pid = self.pid.take().unwrap_or_default();

        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                debug!(pid, error = %e, "kill failed, target may have already exited");
            }
            match child.wait().await {
                Ok(status) => info!(pid, %status, "target reaped"),
                Err(e) => warn!(pid, error = %e, "failed to reap target"),
            }
        }

        self.state = SupervisorState::Stopped;
        Ok(pid)
    }
}

/// Relative paths naming a file (`./core-cpu1`, `bin/fsw`) are taken relative
/// to the working directory; bare names are left for `PATH` lookup.
fn resolve_binary(workdir: &Path, binary: &str) -> PathBuf {
    let path = Path::new(binary);
    if path.is_absolute() || path.components().count() == 1 {
        path.to_path_buf()
    } else {
        workdir.join(path)
    }
}
