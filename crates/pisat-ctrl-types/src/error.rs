//! Wire encoding errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("serialisation error: {0}")]
    Serialization(String),

    #[error("deserialisation error: {0}")]
    Deserialization(String),

    #[error("invalid packet length: expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}
