//! Compact hex notation used for byte patterns (`"01 F7 08 1A"`).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid hex byte '{0}'")]
    InvalidToken(String),
}

/// Decode one byte written as one or two hex digits.
pub fn decode_hex_byte(token: &str) -> Result<u8, DecodeError> {
    let token = token.trim();
    let digits_ok = matches!(token.len(), 1 | 2) && token.bytes().all(|b| b.is_ascii_hexdigit());
    if !digits_ok {
        return Err(DecodeError::InvalidToken(token.to_string()));
    }
    u8::from_str_radix(token, 16).map_err(|_| DecodeError::InvalidToken(token.to_string()))
}

/// Decode whitespace-separated hex bytes.
pub fn decode_compact(text: &str) -> Result<Vec<u8>, DecodeError> {
    text.split_whitespace().map(decode_hex_byte).collect()
}

/// Render bytes back into compact notation.
pub fn encode_compact(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_bytes() {
        assert_eq!(decode_hex_byte("41"), Ok(0x41));
        assert_eq!(decode_hex_byte("f"), Ok(0x0F));
        assert_eq!(decode_hex_byte(" fe "), Ok(0xFE));
        assert!(decode_hex_byte("").is_err());
        assert!(decode_hex_byte("123").is_err());
        assert!(decode_hex_byte("+1").is_err());
        assert!(decode_hex_byte("zz").is_err());
    }

    #[test]
    fn compact_notation() {
        assert_eq!(
            decode_compact("01 F7 08\t1a\n"),
            Ok(vec![0x01, 0xF7, 0x08, 0x1A])
        );
        assert_eq!(decode_compact("   "), Ok(Vec::new()));
        assert_eq!(
            decode_compact("01 G7"),
            Err(DecodeError::InvalidToken("G7".into()))
        );
        assert_eq!(encode_compact(&[0x01, 0xF7]), "01 F7");
    }
}
