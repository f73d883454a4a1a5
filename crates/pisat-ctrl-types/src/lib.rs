//! Shared types for pisat-ctrl.
//!
//! This crate contains the types shared between the control daemon and the
//! ground-side tooling: the command name table, fixed-width text fields, and
//! the binary telemetry packet layout.

pub mod command;
pub mod error;
pub mod telemetry;
pub mod text;

pub use command::Command;
pub use error::ProtocolError;
pub use telemetry::{TelemetryPacket, TELEMETRY_PACKET_LEN};
pub use text::{decode_text, encode_text, TextField, TEXT_FIELD_LEN};
