//! Message headers as read from the mailbox and as rewritten by the repair stages.

use crate::parser::header::{decode_encoded_words, decode_header_bytes};

/// The value of a single header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    /// Unfolded bytes exactly as found after the colon: possibly 8-bit,
    /// possibly RFC 2047 encoded. Written back verbatim.
    Raw(Vec<u8>),
    /// A decoded value set by the repair pipeline. Non-ASCII words are
    /// RFC 2047 encoded when written.
    Text(String),
}

impl HeaderValue {
    /// Decoded, trimmed text of the value.
    pub fn decoded(&self) -> String {
        match self {
            HeaderValue::Raw(bytes) => {
                decode_encoded_words(&decode_header_bytes(bytes)).trim().to_string()
            }
            HeaderValue::Text(text) => text.clone(),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Text(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::Text(value)
    }
}

/// A header field. Names keep their original spelling; comparisons ignore case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: HeaderValue,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Case-insensitive name check.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// `Content-*` headers travel with the body when a part is wrapped.
    pub fn is_content_header(&self) -> bool {
        self.name.len() >= 8 && self.name[..8].eq_ignore_ascii_case("content-")
    }
}
