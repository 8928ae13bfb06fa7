//! Charset and transfer-decoding helpers shared by the parser and the
//! repair stages. Encoding for output is left to `mail-builder`.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use encoding_rs::{EncoderResult, Encoding, REPLACEMENT, UTF_8};
use quoted_printable::ParseMode;

/// Base64 engine that tolerates missing padding and trailing bits, as found
/// in recovered mail.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Resolve a charset label through the WHATWG registry.
///
/// Labels that map to the `replacement` encoding decode everything to a
/// single U+FFFD, so they are treated as unknown.
pub fn lookup_charset(label: &str) -> Option<&'static Encoding> {
    let label = label.trim().trim_matches('"');
    Encoding::for_label(label.as_bytes()).filter(|enc| *enc != REPLACEMENT)
}

/// True when `encoding` can write text as well as read it. The UTF-16
/// labels decode only: `encoding_rs` writes them as UTF-8.
pub fn can_encode(encoding: &'static Encoding) -> bool {
    encoding.output_encoding() == encoding
}

/// Decode `bytes` with `encoding`, turning malformed sequences into U+FFFD.
pub fn decode_lossy(encoding: &'static Encoding, bytes: &[u8]) -> String {
    let (text, _) = encoding.decode_without_bom_handling(bytes);
    text.into_owned()
}

/// Encode `text` with `encoding`, replacing unmappable characters with `?`.
pub fn encode_lossy(encoding: &'static Encoding, text: &str) -> Vec<u8> {
    let encoding = encoding.output_encoding();
    if encoding == UTF_8 {
        return text.as_bytes().to_vec();
    }

    let mut encoder = encoding.new_encoder();
    let mut out = Vec::with_capacity(text.len() + 16);
    let mut src = text;
    loop {
        let (result, read) = encoder.encode_from_utf8_to_vec_without_replacement(src, &mut out, true);
        src = &src[read..];
        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::OutputFull => out.reserve(src.len() + 16),
            EncoderResult::Unmappable(_) => out.push(b'?'),
        }
    }
    out
}

/// Undo a `Content-Transfer-Encoding`. Unknown or identity encodings return
/// the input unchanged; undecodable base64 or quoted-printable falls back
/// to the raw bytes.
pub fn decode_transfer(encoding: Option<&str>, raw: &[u8]) -> Vec<u8> {
    let encoding = encoding.map(|e| e.trim().to_ascii_lowercase());
    match encoding.as_deref() {
        Some("base64") => decode_base64(raw).unwrap_or_else(|| raw.to_vec()),
        Some("quoted-printable") => decode_quoted_printable(raw),
        _ => raw.to_vec(),
    }
}

/// Lenient base64: characters outside the alphabet (line breaks, stray
/// spaces) are skipped and padding is optional.
pub fn decode_base64(raw: &[u8]) -> Option<Vec<u8>> {
    let cleaned: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|b| b.is_ascii_alphanumeric() || *b == b'+' || *b == b'/' || *b == b'=')
        .collect();
    LENIENT_BASE64.decode(&cleaned).ok()
}

/// Quoted-printable decoding line by line.
///
/// Hard line breaks stay `\n`, soft breaks (`=` at the end of a line) join
/// lines, and raw 8-bit bytes that mislabeled bodies carry are kept.
fn decode_quoted_printable(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut lines = raw.split(|&b| b == b'\n').peekable();
    while let Some(line) = lines.next() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let mut escaped = Vec::with_capacity(line.len());
        for &b in line {
            if b.is_ascii() {
                escaped.push(b);
            } else {
                escaped.extend_from_slice(format!("={b:02X}").as_bytes());
            }
        }
        let soft_break = escaped
            .iter()
            .rposition(|b| !b" \t".contains(b))
            .is_some_and(|pos| escaped[pos] == b'=');

        match quoted_printable::decode(&escaped, ParseMode::Robust) {
            Ok(bytes) => out.extend_from_slice(&bytes),
            Err(_) => out.extend_from_slice(line),
        }
        if !soft_break && lines.peek().is_some() {
            out.push(b'\n');
        }
    }
    out
}
