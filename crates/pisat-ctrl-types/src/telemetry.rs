//! Telemetry packet: fixed-layout little-endian status datagram.
//!
//! Layout on the wire (268 bytes):
//!   [packet_id i16][sequence i16][valid i16][invalid i16]
//!   [running i16][reserved i16][event 128 bytes][components 128 bytes]
//!
//! Encoded with bincode's legacy configuration: fixed-width little-endian
//! integers, and fixed arrays written without a length prefix.

use bincode::{Decode, Encode};

use crate::error::ProtocolError;
use crate::text::{decode_text, TextField, TEXT_FIELD_LEN};

/// Size in bytes of an encoded [`TelemetryPacket`].
pub const TELEMETRY_PACKET_LEN: usize = 6 * 2 + 2 * TEXT_FIELD_LEN;

/// One status report sent by the telemetry publisher.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct TelemetryPacket {
    pub packet_id: i16,
    pub sequence: i16,
    pub valid_commands: i16,
    pub invalid_commands: i16,
    /// 1 while the supervised process is running, otherwise 0.
    pub target_running: i16,
    pub reserved: i16,
    pub current_event: TextField,
    pub loaded_components: TextField,
}

impl TelemetryPacket {
    /// Encode to the fixed wire layout.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let bytes = bincode::encode_to_vec(self, bincode::config::legacy())
            .map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        if bytes.len() != TELEMETRY_PACKET_LEN {
            return Err(ProtocolError::Length {
                expected: TELEMETRY_PACKET_LEN,
                actual: bytes.len(),
            });
        }
        Ok(bytes)
    }

    /// Decode a datagram payload. Anything but an exact-length payload is rejected.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() != TELEMETRY_PACKET_LEN {
            return Err(ProtocolError::Length {
                expected: TELEMETRY_PACKET_LEN,
                actual: payload.len(),
            });
        }
        let (packet, _) = bincode::decode_from_slice(payload, bincode::config::legacy())
            .map_err(|e| ProtocolError::Deserialization(e.to_string()))?;
        Ok(packet)
    }

    /// Reinterpret an unsigned counter as the signed 16-bit wire word.
    pub fn word(value: u16) -> i16 {
        i16::from_le_bytes(value.to_le_bytes())
    }

    /// Sequence count as the unsigned counter the publisher keeps.
    pub fn sequence_count(&self) -> u16 {
        u16::from_le_bytes(self.sequence.to_le_bytes())
    }

    pub fn event_text(&self) -> String {
        decode_text(&self.current_event)
    }

    pub fn components_text(&self) -> String {
        decode_text(&self.loaded_components)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::encode_text;

    fn sample() -> TelemetryPacket {
        TelemetryPacket {
            packet_id: 0x0F40,
            sequence: 7,
            valid_commands: 3,
            invalid_commands: 1,
            target_running: 1,
            reserved: 0,
            current_event: encode_text("Start cFS, pid = 42"),
            loaded_components: encode_text("CompA, CompB"),
        }
    }

    #[test]
    fn encoded_length_is_fixed() {
        assert_eq!(TELEMETRY_PACKET_LEN, 268);
        assert_eq!(sample().encode().unwrap().len(), TELEMETRY_PACKET_LEN);

        let mut long = sample();
        long.current_event = encode_text(&"e".repeat(500));
        assert_eq!(long.encode().unwrap().len(), TELEMETRY_PACKET_LEN);
    }

    #[test]
    fn header_words_are_little_endian() {
        let bytes = sample().encode().unwrap();
        assert_eq!(&bytes[0..2], &0x0F40i16.to_le_bytes());
        assert_eq!(&bytes[2..4], &7i16.to_le_bytes());
        assert_eq!(&bytes[4..6], &3i16.to_le_bytes());
        assert_eq!(&bytes[6..8], &1i16.to_le_bytes());
        assert_eq!(&bytes[8..10], &1i16.to_le_bytes());
        assert_eq!(&bytes[10..12], &[0, 0]);
        assert_eq!(&bytes[12..31], b"Start cFS, pid = 42");
        assert_eq!(bytes[31], 0);
        assert_eq!(&bytes[140..152], b"CompA, CompB");
    }

    #[test]
    fn decode_reads_back_fields() {
        let bytes = sample().encode().unwrap();
        let packet = TelemetryPacket::decode(&bytes).unwrap();
        assert_eq!(packet, sample());
        assert_eq!(packet.event_text(), "Start cFS, pid = 42");
        assert_eq!(packet.components_text(), "CompA, CompB");
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let err = TelemetryPacket::decode(&[0u8; 10]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Length {
                expected: 268,
                actual: 10
            }
        ));
    }

    #[test]
    fn wrapped_sequence_round_trips_through_signed_word() {
        let mut packet = sample();
        packet.sequence = TelemetryPacket::word(u16::MAX);
        assert_eq!(packet.sequence, -1);
        assert_eq!(packet.sequence_count(), u16::MAX);
    }
}
