//! Config loading and event log construction.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::DaemonError;
use crate::event_log::{EventLog, FileSink, TracingSink};

/// Load configuration from the given path, or the default location.
///
/// An explicitly named file must exist. A missing default file yields the
/// built-in defaults.
pub fn load_config(path: Option<&str>) -> Result<Config, DaemonError> {
    let (config_path, explicit) = match path {
        Some(p) => (PathBuf::from(p), true),
        None => (default_config_path(), false),
    };

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| DaemonError::Config(format!("failed to read config: {e}")))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| DaemonError::Config(format!("failed to parse config: {e}")))?;
        info!(path = %config_path.display(), "loaded config");
        Ok(config)
    } else if explicit {
        Err(DaemonError::Config(format!(
            "config file not found: {}",
            config_path.display()
        )))
    } else {
        info!("no config file found, using defaults");
        Ok(Config::default())
    }
}

/// Build the event log: file-backed when `log.file` is set, tracing otherwise.
pub fn event_log(config: &Config) -> EventLog {
    match &config.log.file {
        Some(path) => match FileSink::open(path) {
            Ok(sink) => {
                info!(path = %path.display(), "event log file opened");
                EventLog::new(Box::new(sink))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to open event log file, logging to console only");
                EventLog::new(Box::new(TracingSink))
            }
        },
        None => EventLog::new(Box::new(TracingSink)),
    }
}

/// Get the default config directory path.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("pisat-ctrl")
}

/// Get the default config file path.
fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = load_config(Some(path.to_str().unwrap())).unwrap_err();
        assert!(matches!(err, DaemonError::Config(_)));
    }

    #[test]
    fn explicit_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pisat-ctrl.toml");
        std::fs::write(&path, "[network]\ncmd_port = 7100\n").unwrap();

        let config = load_config(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.network.cmd_port, 7100);
        assert_eq!(config.network.tlm_port, 6001);
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[network\n").unwrap();
        assert!(matches!(
            load_config(Some(path.to_str().unwrap())),
            Err(DaemonError::Config(_))
        ));
    }

    #[test]
    fn event_log_writes_to_configured_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.log.file = Some(dir.path().join("events.log"));

        let mut log = event_log(&config);
        log.info("hello file");
        let content = std::fs::read_to_string(dir.path().join("events.log")).unwrap();
        assert!(content.contains("INFO hello file"));
    }
}
