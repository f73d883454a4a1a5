//! Daemon configuration loaded from TOML.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DaemonError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Command and telemetry socket settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Address the command socket binds to.
    #[serde(default = "default_cmd_bind")]
    pub cmd_bind: String,
    #[serde(default = "default_cmd_port")]
    pub cmd_port: u16,
    /// Largest command datagram accepted; longer payloads are truncated.
    #[serde(default = "default_cmd_buf_size")]
    pub cmd_buf_size: usize,
    #[serde(default = "default_tlm_addr")]
    pub tlm_addr: String,
    #[serde(default = "default_tlm_port")]
    pub tlm_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            cmd_bind: default_cmd_bind(),
            cmd_port: default_cmd_port(),
            cmd_buf_size: default_cmd_buf_size(),
            tlm_addr: default_tlm_addr(),
            tlm_port: default_tlm_port(),
        }
    }
}

impl NetworkConfig {
    /// Socket address the command socket binds to.
    pub fn cmd_socket_addr(&self) -> Result<SocketAddr, DaemonError> {
        socket_addr(&self.cmd_bind, self.cmd_port)
    }

    /// Destination of telemetry packets.
    pub fn tlm_socket_addr(&self) -> Result<SocketAddr, DaemonError> {
        socket_addr(&self.tlm_addr, self.tlm_port)
    }
}

/// Telemetry stream settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
    #[serde(default = "default_packet_id")]
    pub packet_id: u16,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            packet_id: default_packet_id(),
        }
    }
}

impl TelemetryConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

/// The supervised flight-software target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Working directory the target is started in.
    #[serde(default = "default_target_path")]
    pub path: PathBuf,
    /// Binary to execute, resolved relative to `path` when not absolute.
    #[serde(default = "default_target_binary")]
    pub binary: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Startup manifest, relative to `path`.
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            path: default_target_path(),
            binary: default_target_binary(),
            args: Vec::new(),
            manifest: default_manifest(),
        }
    }
}

impl TargetConfig {
    pub fn manifest_path(&self) -> PathBuf {
        self.path.join(&self.manifest)
    }
}

/// Host-level action commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default = "default_halt_command")]
    pub halt_command: Vec<String>,
    #[serde(default = "default_reboot_command")]
    pub reboot_command: Vec<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            halt_command: default_halt_command(),
            reboot_command: default_reboot_command(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Event log file; events are appended here in addition to tracing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn socket_addr(host: &str, port: u16) -> Result<SocketAddr, DaemonError> {
    let ip: IpAddr = host
        .parse()
        .map_err(|e| DaemonError::Config(format!("invalid address {host:?}: {e}")))?;
    Ok(SocketAddr::new(ip, port))
}

fn default_cmd_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_cmd_port() -> u16 {
    6000
}

fn default_cmd_buf_size() -> usize {
    1024
}

fn default_tlm_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_tlm_port() -> u16 {
    6001
}

fn default_period_ms() -> u64 {
    1000
}

fn default_packet_id() -> u16 {
    0x0F40
}

fn default_target_path() -> PathBuf {
    PathBuf::from("/home/pi/cfs/build/exe/cpu1")
}

fn default_target_binary() -> String {
    "./core-cpu1".to_string()
}

fn default_manifest() -> PathBuf {
    PathBuf::from("cf/cfe_es_startup.scr")
}

fn default_halt_command() -> Vec<String> {
    vec![
        "sudo".to_string(),
        "shutdown".to_string(),
        "-h".to_string(),
        "now".to_string(),
    ]
}

fn default_reboot_command() -> Vec<String> {
    vec!["sudo".to_string(), "reboot".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}
