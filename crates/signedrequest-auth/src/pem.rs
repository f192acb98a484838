//! Lenient PEM block extraction.
//!
//! Certificates arrive from directories and key services in whatever form
//! their producer wrote: chain bundles, CRLF line endings, explanatory text
//! before the armor, base64 wrapped at 64 or 76 columns. Only the first block
//! that decodes is used; anything after it is ignored.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

const BEGIN: &str = "-----BEGIN ";
const DASHES: &str = "-----";

/// Decode the body of the first well-formed PEM block in `data`.
///
/// The type label is not checked. Blocks with a malformed label, a missing
/// `END` line or an undecodable body are skipped.
pub(crate) fn decode_first(data: &[u8]) -> Option<Vec<u8>> {
    let text = String::from_utf8_lossy(data);
    let mut rest = text.as_ref();

    while let Some(start) = rest.find(BEGIN) {
        rest = &rest[start + BEGIN.len()..];
        if let Some(block) = decode_block(rest) {
            return Some(block);
        }
    }
    None
}

/// Decode a block whose `-----BEGIN ` prefix was already consumed.
fn decode_block(after_begin: &str) -> Option<Vec<u8>> {
    let (label, body) = after_begin.split_once(DASHES)?;
    if label.is_empty() || label.contains(['\r', '\n']) {
        return None;
    }

    let end_line = format!("-----END {label}-----");
    let encoded: String = body[..body.find(&end_line)?]
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD.decode(encoded).ok()
}
