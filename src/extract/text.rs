//! Plain text and opaque binary content.

use base64::Engine;

/// Decode bytes as UTF-8, replacing invalid sequences.
pub fn decode_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Strict UTF-8 decode, or standard base64 of the raw bytes when the
/// content is not valid UTF-8.
pub fn binary_fallback(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => base64::engine::general_purpose::STANDARD.encode(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lossy_keeps_valid_text() {
        assert_eq!(decode_lossy("héllo".as_bytes()), "héllo");
    }

    #[test]
    fn test_lossy_replaces_invalid_bytes() {
        let text = decode_lossy(b"ok\xffdone");
        assert!(text.starts_with("ok"));
        assert!(text.ends_with("done"));
    }

    #[test]
    fn test_binary_fallback_valid_utf8_passes_through() {
        assert_eq!(binary_fallback(b"plain"), "plain");
    }

    #[test]
    fn test_binary_fallback_encodes_invalid_utf8() {
        assert_eq!(binary_fallback(&[0xff, 0xfe, 0x00]), "//4A");
    }
}
