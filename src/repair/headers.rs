//! Header sanitizing.
//!
//! Every header instance is cleaned on its own: line-break characters are
//! removed, split UTF-16 surrogate pairs are joined, and everything outside
//! Latin-1 becomes `?` (except in `Subject`). A `From` that cannot be
//! cleaned is replaced by a sentinel address; other failures leave the value
//! untouched.

use encoding_rs::WINDOWS_1252;
use tracing::debug;

use crate::codec::decode_lossy;
use crate::error::{RepairError, Result};
use crate::model::{HeaderValue, MimePart};
use crate::parser::header::decode_encoded_words;
use crate::report::{RepairEvent, Reporter};

/// Code points treated as line boundaries in header values.
const LINE_BREAKS: [u16; 10] = [
    0x000A, 0x000D, 0x000B, 0x000C, 0x001C, 0x001D, 0x001E, 0x0085, 0x2028, 0x2029,
];

/// Sanitize every header of `message` in place.
pub fn sanitize_headers(message: &mut MimePart, failed_from: &str, reporter: &mut dyn Reporter) {
    for header in message.headers_mut().iter_mut() {
        match sanitize_value(&header.name, &header.value) {
            Ok(clean) => header.value = HeaderValue::Text(clean),
            Err(err) if header.is("From") => {
                reporter.report(RepairEvent::HeaderFailed {
                    name: header.name.clone(),
                    replacement: failed_from.to_string(),
                });
                debug!(error = %err, "Replacing From header");
                header.value = HeaderValue::Text(failed_from.to_string());
            }
            Err(err) => debug!(header = %header.name, error = %err, "Header left unsanitized"),
        }
    }
}

/// Clean a single header value.
pub fn sanitize_value(name: &str, value: &HeaderValue) -> Result<String> {
    let mut units = wide_units(value);
    units.retain(|u| !LINE_BREAKS.contains(u));

    let text = String::from_utf16(&units).map_err(|_| RepairError::InvalidHeader {
        name: name.to_string(),
    })?;

    let text = if name.eq_ignore_ascii_case("subject") {
        text
    } else {
        text.chars()
            .map(|c| if u32::from(c) > 0xFF { '?' } else { c })
            .collect()
    };
    Ok(text.trim().to_string())
}

/// UTF-16 code units of a header value, surrogates passed through.
///
/// Raw bytes decode as UTF-8, except that CESU-8 encoded surrogates become
/// the surrogate unit they encode and any other invalid byte is read as
/// windows-1252. When the result holds no lone surrogate, RFC 2047 encoded
/// words are decoded.
fn wide_units(value: &HeaderValue) -> Vec<u16> {
    match value {
        HeaderValue::Text(text) => text.encode_utf16().collect(),
        HeaderValue::Raw(bytes) => {
            let units = wtf8_units(bytes);
            match String::from_utf16(&units) {
                Ok(text) => decode_encoded_words(&text).encode_utf16().collect(),
                Err(_) => units,
            }
        }
    }
}

fn wtf8_units(bytes: &[u8]) -> Vec<u16> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut rest = bytes;
    while !rest.is_empty() {
        match std::str::from_utf8(rest) {
            Ok(text) => {
                units.extend(text.encode_utf16());
                break;
            }
            Err(err) => {
                let (valid, invalid) = rest.split_at(err.valid_up_to());
                units.extend(String::from_utf8_lossy(valid).encode_utf16());
                if let Some(unit) = cesu_surrogate(invalid) {
                    units.push(unit);
                    rest = &invalid[3..];
                } else {
                    units.extend(decode_lossy(WINDOWS_1252, &invalid[..1]).encode_utf16());
                    rest = &invalid[1..];
                }
            }
        }
    }
    units
}

/// The surrogate unit encoded by a leading `ED A0..BF 80..BF` sequence.
fn cesu_surrogate(bytes: &[u8]) -> Option<u16> {
    match bytes {
        [0xED, b1 @ 0xA0..=0xBF, b2 @ 0x80..=0xBF, ..] => {
            Some(0xD000 | (u16::from(b1 & 0x3F) << 6) | u16::from(b2 & 0x3F))
        }
        _ => None,
    }
}
