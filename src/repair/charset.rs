//! Body charset normalization.
//!
//! Makes the declared charset one that decodes, quotes `From ` lines,
//! round-trips the text through its charset and relabels bodies that turn
//! out to hold UTF-8.

use std::sync::LazyLock;

use encoding_rs::UTF_8;
use regex::bytes::Regex as BytesRegex;
use regex::Regex;

use crate::codec::{can_encode, decode_lossy, encode_lossy, lookup_charset};
use crate::model::MimePart;
use crate::report::{RepairEvent, Reporter};

/// Charset assumed when none is declared.
pub const DEFAULT_CHARSET: &str = "utf-8";

static FROM_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^From ").expect("valid From_ quoting pattern"));

/// Any well-formed UTF-8 multi-byte sequence.
static UTF8_SEQUENCE: LazyLock<BytesRegex> = LazyLock::new(|| {
    BytesRegex::new(
        r"(?-u)[\xC2-\xDF][\x80-\xBF]|\xE0[\xA0-\xBF][\x80-\xBF]|[\xE1-\xEC][\x80-\xBF]{2}|\xED[\x80-\x9F][\x80-\xBF]|[\xEE-\xEF][\x80-\xBF]{2}|\xF0[\x90-\xBF][\x80-\xBF]{2}|[\xF1-\xF3][\x80-\xBF]{3}|\xF4[\x80-\x8F][\x80-\xBF]{2}",
    )
    .expect("valid UTF-8 sequence pattern")
});

/// Quote body lines starting with `From ` as ` From ` (mboxrd style).
pub fn quote_from_lines(text: &str) -> String {
    FROM_LINE.replace_all(text, " From ").into_owned()
}

/// True when `bytes` contain a UTF-8 multi-byte sequence.
pub fn contains_utf8_sequence(bytes: &[u8]) -> bool {
    UTF8_SEQUENCE.is_match(bytes)
}

/// Normalize the body of a single-part text message in place.
///
/// Returns the resulting body text, or `None` when the body is multipart or
/// not text and was left alone.
pub fn normalize_charset(message: &mut MimePart, reporter: &mut dyn Reporter) -> Option<String> {
    let content_type = message.content_type();
    if message.is_multipart() || !content_type.is_text() {
        reporter.report(RepairEvent::BodyLeftAsIs {
            content_type: content_type.mime_type(),
        });
        return None;
    }

    let mut charset = message
        .content_charset()
        .unwrap_or_else(|| DEFAULT_CHARSET.to_string());
    let encoding = match lookup_charset(&charset) {
        Some(encoding) if can_encode(encoding) => encoding,
        Some(_) => {
            let text = message.text_content()?;
            reporter.report(RepairEvent::CharsetNotEncodable { charset });
            message.set_text(&text, &content_type.subtype, DEFAULT_CHARSET);
            charset = DEFAULT_CHARSET.to_string();
            UTF_8
        }
        None => {
            reporter.report(RepairEvent::InvalidCharset { charset });
            message.replace_header(
                "Content-Type",
                format!("{}; charset=\"{DEFAULT_CHARSET}\"", content_type.mime_type()),
            );
            charset = DEFAULT_CHARSET.to_string();
            UTF_8
        }
    };

    let text = message.text_content()?;
    let quoted = quote_from_lines(&text);
    let cleaned = decode_lossy(encoding, &encode_lossy(encoding, &quoted));
    message.set_text(&cleaned, &content_type.subtype, &charset);
    message.ensure_mime_version();

    if encoding != UTF_8 {
        let bytes = encode_lossy(encoding, &message.text_content()?);
        if contains_utf8_sequence(&bytes) {
            reporter.report(RepairEvent::UnicodeTextFound {
                charset: charset.clone(),
            });
            message.set_text(&String::from_utf8_lossy(&bytes), &content_type.subtype, DEFAULT_CHARSET);
        }
    }

    message.text_content()
}
