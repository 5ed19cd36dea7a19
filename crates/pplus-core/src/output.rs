//! UTF-16LE encoding of generated programs.
//!
//! The calculator reads program source as little-endian UTF-16 behind a
//! byte order mark. Carriage returns are dropped.

const BOM: [u8; 2] = [0xFF, 0xFE];

pub fn encode_utf16le(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(2 + text.len() * 2);
    bytes.extend_from_slice(&BOM);
    for unit in text.encode_utf16().filter(|&unit| unit != u16::from(b'\r')) {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

/// Decode UTF-16LE bytes, with or without a byte order mark
pub fn decode_utf16le(bytes: &[u8]) -> Option<String> {
    let body = bytes.strip_prefix(&BOM).unwrap_or(bytes);
    if body.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding() {
        assert_eq!(encode_utf16le("A≤\r\n"), vec![0xFF, 0xFE, 0x41, 0x00, 0x64, 0x22, 0x0A, 0x00]);
    }

    #[test]
    fn test_decoding() {
        let bytes = encode_utf16le("IF a ≠ b THEN\n");
        assert_eq!(decode_utf16le(&bytes).as_deref(), Some("IF a ≠ b THEN\n"));
        assert_eq!(decode_utf16le(&[0x41]), None);
    }
}
