//! services/api/src/adapters/extract/text.rs

/// Decodes a plain-text upload. A UTF-8 byte-order mark is dropped; bytes that
/// are not valid UTF-8 are read as Latin-1, so this never fails.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}
