// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Byte/text codec for calendar documents.
//!
//! Calendar producers disagree on encodings; downloads are decoded leniently
//! so a stray byte never aborts a whole synchronization pass.

/// Character set used to decode or encode calendar text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    /// UTF-8, the wire default.
    #[default]
    Utf8,
    /// US-ASCII with byte-per-char decoding, used by the parser recovery path.
    Ascii,
}

/// Decodes calendar bytes into text.
///
/// Invalid UTF-8 sequences are replaced rather than rejected; ASCII decoding
/// maps every byte to the char with the same code point.
#[must_use]
pub fn decode(bytes: &[u8], charset: Charset) -> String {
    match charset {
        Charset::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        Charset::Ascii => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Encodes calendar text into bytes.
#[must_use]
pub fn encode(text: &str, charset: Charset) -> Vec<u8> {
    match charset {
        Charset::Utf8 => text.as_bytes().to_vec(),
        Charset::Ascii => text
            .chars()
            .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
            .collect(),
    }
}
