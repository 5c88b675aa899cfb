//! Text encodings for TextGrid files
//!
//! Stored TextGrids are always written as UTF-16 big-endian with a byte order
//! mark, which Praat reads and writes losslessly for IPA. Files produced by
//! other tools may be UTF-16 in either byte order or UTF-8, so reading
//! sniffs the encoding.

use crate::{Error, Result};

const BOM_UTF16_BE: [u8; 2] = [0xFE, 0xFF];
const BOM_UTF16_LE: [u8; 2] = [0xFF, 0xFE];
const BOM_UTF8: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Encode text as UTF-16 BE with a leading byte order mark
pub fn encode_utf16(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + text.len() * 2);
    out.extend_from_slice(&BOM_UTF16_BE);
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

/// Decode file bytes, detecting UTF-16 (either byte order) or UTF-8
pub fn decode_text(bytes: &[u8]) -> Result<String> {
    if bytes.starts_with(&BOM_UTF16_BE) {
        return decode_utf16(&bytes[2..], u16::from_be_bytes);
    }
    if bytes.starts_with(&BOM_UTF16_LE) {
        return decode_utf16(&bytes[2..], u16::from_le_bytes);
    }
    if bytes.starts_with(&BOM_UTF8) {
        return decode_utf8(&bytes[3..]);
    }
    // BOM-less UTF-16: ASCII header characters leave a zero in every other byte
    match bytes {
        [0, b, ..] if *b != 0 => decode_utf16(bytes, u16::from_be_bytes),
        [a, 0, ..] if *a != 0 => decode_utf16(bytes, u16::from_le_bytes),
        _ => decode_utf8(bytes),
    }
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(Error::Parse(
            "UTF-16 content has an odd number of bytes".to_string(),
        ));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| Error::Parse(format!("invalid UTF-16: {}", e)))
}

fn decode_utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| Error::Parse(format!("invalid UTF-8: {}", e)))
}
