//! Lenient parsing of a raw message block into a [`MimePart`].
//!
//! The header section ends at the first empty line, or at the first line
//! that is neither a `name:` field nor a folded continuation. Everything
//! after that is the body, kept byte for byte.

use crate::model::{Body, Header, HeaderValue, MimePart};

/// Parse a raw block. Never fails: malformed header lines are skipped or
/// start the body.
pub fn parse_message(block: &[u8]) -> MimePart {
    let mut headers: Vec<(String, Vec<u8>)> = Vec::new();
    let mut pos = 0;
    let mut body_start = block.len();

    while pos < block.len() {
        let end = block[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(block.len(), |i| pos + i + 1);
        let line = &block[pos..end];
        let content = strip_line_ending(line);

        if content.is_empty() {
            body_start = end;
            break;
        }

        if content[0] == b' ' || content[0] == b'\t' {
            // Continuation before any field has nowhere to go.
            if let Some((_, value)) = headers.last_mut() {
                value.extend_from_slice(content);
            }
        } else if content.starts_with(b"From ") {
            // A stray envelope line inside the header section.
        } else if let Some(colon) = header_name_end(content) {
            if colon > 0 {
                let name = String::from_utf8_lossy(&content[..colon]).into_owned();
                let value = trim_leading_blanks(&content[colon + 1..]).to_vec();
                headers.push((name, value));
            }
        } else {
            body_start = pos;
            break;
        }
        pos = end;
    }

    let headers = headers
        .into_iter()
        .map(|(name, value)| Header::new(name, HeaderValue::Raw(value)))
        .collect();
    MimePart::new(headers, Body::Single(block[body_start..].to_vec()))
}

/// Index of the colon when `line` starts with a field name
/// (printable ASCII except `:`, possibly empty) followed by `:`.
fn header_name_end(line: &[u8]) -> Option<usize> {
    let colon = line
        .iter()
        .position(|&b| !matches!(b, 0x21..=0x39 | 0x3b..=0x7e))?;
    (line[colon] == b':').then_some(colon)
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn trim_leading_blanks(value: &[u8]) -> &[u8] {
    let start = value
        .iter()
        .position(|&b| b != b' ' && b != b'\t')
        .unwrap_or(value.len());
    &value[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(part: &MimePart, name: &str) -> Vec<u8> {
        match &part.headers().iter().find(|h| h.is(name)).unwrap().value {
            HeaderValue::Raw(bytes) => bytes.clone(),
            HeaderValue::Text(text) => text.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_headers_and_body() {
        let part = parse_message(b"From: a@example.com\r\nSubject: hi\r\n\r\nbody line\r\n");
        assert_eq!(part.headers().len(), 2);
        assert_eq!(part.get("from").as_deref(), Some("a@example.com"));
        assert_eq!(part.body(), &Body::Single(b"body line\r\n".to_vec()));
    }

    #[test]
    fn test_folded_header_is_unfolded() {
        let part = parse_message(b"Subject: first\n second\n\tthird\nTo: b@example.com\n\nx");
        assert_eq!(raw(&part, "subject"), b"first second\tthird".to_vec());
        assert_eq!(part.get("to").as_deref(), Some("b@example.com"));
    }

    #[test]
    fn test_non_header_line_starts_body() {
        let part = parse_message(b"From: a@example.com\nThis is not a header\nSecond line\n");
        assert_eq!(part.headers().len(), 1);
        assert_eq!(
            part.body(),
            &Body::Single(b"This is not a header\nSecond line\n".to_vec())
        );
    }

    #[test]
    fn test_empty_name_and_stray_envelope_skipped() {
        let part = parse_message(b": orphan\nFrom someone Mon\nSubject: kept\n\n");
        assert_eq!(part.headers().len(), 1);
        assert_eq!(part.get("subject").as_deref(), Some("kept"));
    }

    #[test]
    fn test_eight_bit_header_kept_raw() {
        let part = parse_message(b"From: M\xfcller <m@example.com>\n\n");
        assert_eq!(raw(&part, "from"), b"M\xfcller <m@example.com>".to_vec());
    }

    #[test]
    fn test_empty_block() {
        let part = parse_message(b"");
        assert!(part.headers().is_empty());
        assert_eq!(part.body(), &Body::Single(Vec::new()));
    }

    #[test]
    fn test_header_name_end() {
        assert_eq!(header_name_end(b"Subject: x"), Some(7));
        assert_eq!(header_name_end(b"Bad Name: x"), None);
        assert_eq!(header_name_end(b"no colon"), None);
        assert_eq!(header_name_end(b":"), Some(0));
    }
}
