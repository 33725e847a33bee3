//! File content decoding
//!
//! Content arrives transport-encoded. The decode order is fixed:
//! base64, then UTF-8, then Windows-1252. A Windows-1252 success means the
//! bytes are not text we can document, so the content is replaced with a
//! byte-count placeholder instead of being forwarded.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::DecodeOutcome;

/// Windows-1252 mapping for 0x80..=0x9F; `None` marks the undefined bytes
const CP1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

/// Placeholder text substituted for binary content
pub fn binary_placeholder(bytes: usize) -> String {
    format!("[binary content: {} bytes]", bytes)
}

/// Decode a file body as returned by the repository API.
///
/// Returns the text to forward (empty when undecodable) and how it was obtained.
pub fn decode_content(content: &str, encoding: &str) -> (String, DecodeOutcome) {
    let bytes = match encoding.to_ascii_lowercase().as_str() {
        "base64" => {
            let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            match STANDARD.decode(compact) {
                Ok(bytes) => bytes,
                Err(e) => {
                    return (
                        String::new(),
                        DecodeOutcome::Undecodable {
                            reason: format!("invalid base64: {}", e),
                        },
                    );
                }
            }
        }
        "" | "text" => content.as_bytes().to_vec(),
        other => {
            return (
                String::new(),
                DecodeOutcome::Undecodable {
                    reason: format!("unsupported transport encoding '{}'", other),
                },
            );
        }
    };

    decode_bytes(bytes)
}

/// Second and third stages: UTF-8, then the single-byte fallback
pub fn decode_bytes(bytes: Vec<u8>) -> (String, DecodeOutcome) {
    match String::from_utf8(bytes) {
        Ok(text) => (text, DecodeOutcome::Utf8),
        Err(e) => {
            let bytes = e.into_bytes();
            match decode_windows_1252(&bytes) {
                Some(_) => (
                    binary_placeholder(bytes.len()),
                    DecodeOutcome::BinaryPlaceholder { bytes: bytes.len() },
                ),
                None => (
                    String::new(),
                    DecodeOutcome::Undecodable {
                        reason: "content is neither UTF-8 nor Windows-1252".to_string(),
                    },
                ),
            }
        }
    }
}

fn decode_windows_1252(bytes: &[u8]) -> Option<String> {
    bytes
        .iter()
        .map(|&b| match b {
            0x80..=0x9F => CP1252_HIGH[(b - 0x80) as usize],
            _ => Some(char::from(b)),
        })
        .collect()
}
