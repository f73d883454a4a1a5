//! Core control daemon for pisat-ctrl.
//!
//! Receives textual commands over UDP, supervises the flight-software target
//! process, triggers host actions, and publishes a periodic binary telemetry
//! packet describing daemon and target state.

pub mod config;
pub mod controller;
pub mod daemon;
pub mod error;
pub mod event_log;
pub mod host;
pub mod manifest;
pub mod registry;
pub mod setup;
pub mod state;
pub mod supervisor;
pub mod telemetry;

pub use config::Config;
pub use controller::{Controller, Disposition};
pub use daemon::{Daemon, ShutdownHandle};
pub use error::DaemonError;
pub use state::{DaemonStatus, SupervisorState};
