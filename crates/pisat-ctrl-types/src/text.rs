//! Fixed-width, NUL-padded text fields used in telemetry.

/// Width in bytes of every text field in the telemetry packet.
pub const TEXT_FIELD_LEN: usize = 128;

/// A NUL-padded ASCII text field.
pub type TextField = [u8; TEXT_FIELD_LEN];

/// Copy `text` into a fixed-width field, truncating and NUL-padding as needed.
///
/// Truncation never splits a UTF-8 character, so the stored prefix always
/// decodes cleanly.
pub fn encode_text(text: &str) -> TextField {
    let mut end = text.len().min(TEXT_FIELD_LEN);
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    let mut field = [0u8; TEXT_FIELD_LEN];
    field[..end].copy_from_slice(&text.as_bytes()[..end]);
    field
}

/// Read a text field back, stopping at the first NUL.
pub fn decode_text(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_nul_padded() {
        let field = encode_text("CompA, CompB");
        assert_eq!(&field[..12], b"CompA, CompB");
        assert!(field[12..].iter().all(|&b| b == 0));
        assert_eq!(decode_text(&field), "CompA, CompB");
    }

    #[test]
    fn long_text_is_truncated_to_field_width() {
        let long = "x".repeat(300);
        let field = encode_text(&long);
        assert!(field.iter().all(|&b| b == b'x'));
        assert_eq!(decode_text(&field).len(), TEXT_FIELD_LEN);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // 127 ASCII bytes followed by a two-byte character straddling the edge.
        let text = format!("{}é", "a".repeat(127));
        let field = encode_text(&text);
        assert_eq!(field[127], 0);
        assert_eq!(decode_text(&field), "a".repeat(127));
    }

    #[test]
    fn empty_text_is_all_nul() {
        assert_eq!(encode_text(""), [0u8; TEXT_FIELD_LEN]);
        assert_eq!(decode_text(&[0u8; TEXT_FIELD_LEN]), "");
    }
}
