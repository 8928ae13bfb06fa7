//! A mutable MIME entity: ordered headers plus a single or multipart body.

use std::cmp::Ordering;

use crate::codec::{self, can_encode, decode_lossy, encode_lossy, lookup_charset};
use crate::error::{RepairError, Result};
use crate::model::content_type::{quote, ContentType};
use crate::model::header::{Header, HeaderValue};

/// Body of a [`MimePart`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Body bytes. Parts read from the mailbox keep their wire bytes and
    /// `Content-Transfer-Encoding`; parts built here carry the plain payload
    /// and no such header, and get encoded when written.
    Single(Vec<u8>),
    /// Child parts. The boundary is chosen when the part is written.
    Multipart(Vec<MimePart>),
}

impl Default for Body {
    fn default() -> Self {
        Body::Single(Vec::new())
    }
}

/// The multipart subtypes the repair pipeline builds, in nesting order:
/// a `related` may sit inside an `alternative`, which may sit inside a `mixed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MultipartKind {
    Related,
    Alternative,
    Mixed,
}

impl MultipartKind {
    pub fn subtype(self) -> &'static str {
        match self {
            MultipartKind::Related => "related",
            MultipartKind::Alternative => "alternative",
            MultipartKind::Mixed => "mixed",
        }
    }

    pub fn from_subtype(subtype: &str) -> Option<Self> {
        match subtype.to_ascii_lowercase().as_str() {
            "related" => Some(MultipartKind::Related),
            "alternative" => Some(MultipartKind::Alternative),
            "mixed" => Some(MultipartKind::Mixed),
            _ => None,
        }
    }

    /// Default `Content-Disposition` of a part added under this kind.
    fn default_disposition(self) -> Option<&'static str> {
        match self {
            MultipartKind::Related => Some("inline"),
            MultipartKind::Alternative => None,
            MultipartKind::Mixed => Some("attachment"),
        }
    }
}

/// A message or one of its sub-parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimePart {
    headers: Vec<Header>,
    body: Body,
}

impl MimePart {
    pub fn new(headers: Vec<Header>, body: Body) -> Self {
        Self { headers, body }
    }

    /// A text part holding `text` in `charset`.
    pub fn text(text: &str, subtype: &str, charset: &str) -> Self {
        let mut part = Self::default();
        part.set_text(text, subtype, charset);
        part
    }

    /// A part of type `mime_type` (`maintype/subtype`) holding `data`.
    pub fn binary(data: &[u8], mime_type: &str) -> Result<Self> {
        let content_type = ContentType::from_mime_type(mime_type)
            .ok_or_else(|| RepairError::InvalidMimeType(mime_type.to_string()))?;
        let headers = vec![Header::new("Content-Type", content_type.mime_type())];
        Ok(Self::new(headers, Body::Single(data.to_vec())))
    }

    // ── Headers ────────────────────────────────────────────────────

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Vec<Header> {
        &mut self.headers
    }

    /// Decoded value of the first header called `name`.
    pub fn get(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|h| h.is(name))
            .map(|h| h.value.decoded())
    }

    /// Replace the value of the first `name` header in place.
    /// Returns `false` when there is no such header.
    pub fn replace_header(&mut self, name: &str, value: impl Into<HeaderValue>) -> bool {
        match self.headers.iter_mut().find(|h| h.is(name)) {
            Some(header) => {
                header.value = value.into();
                true
            }
            None => false,
        }
    }

    /// Replace the first `name` header, or append one.
    pub fn set_header(&mut self, name: &str, value: impl Into<HeaderValue>) {
        let value = value.into();
        if !self.replace_header(name, value.clone()) {
            self.headers.push(Header::new(name, value));
        }
    }

    pub fn add_header(&mut self, name: &str, value: impl Into<HeaderValue>) {
        self.headers.push(Header::new(name, value));
    }

    /// Add `MIME-Version: 1.0` if absent. Only meaningful on a top-level message.
    pub fn ensure_mime_version(&mut self) {
        if self.get("MIME-Version").is_none() {
            self.add_header("MIME-Version", "1.0");
        }
    }

    // ── Content ────────────────────────────────────────────────────

    /// Parsed `Content-Type`, `text/plain` when absent or malformed.
    pub fn content_type(&self) -> ContentType {
        self.get("Content-Type")
            .map(|v| ContentType::parse(&v))
            .unwrap_or_default()
    }

    /// Lowercased `charset` parameter of the `Content-Type`.
    pub fn content_charset(&self) -> Option<String> {
        self.content_type().charset()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self.body, Body::Multipart(_))
    }

    /// Child parts, empty for a single-bodied part.
    pub fn children(&self) -> &[MimePart] {
        match &self.body {
            Body::Multipart(children) => children,
            Body::Single(_) => &[],
        }
    }

    /// Payload with the transfer encoding undone. `None` for multipart bodies.
    pub fn decoded_body(&self) -> Option<Vec<u8>> {
        match &self.body {
            Body::Single(raw) => {
                let cte = self.get("Content-Transfer-Encoding");
                Some(codec::decode_transfer(cte.as_deref(), raw))
            }
            Body::Multipart(_) => None,
        }
    }

    /// Body text decoded with the declared charset. Unknown or missing
    /// charsets read as UTF-8; malformed sequences become U+FFFD.
    pub fn text_content(&self) -> Option<String> {
        let bytes = self.decoded_body()?;
        let encoding = self
            .content_charset()
            .and_then(|label| lookup_charset(&label))
            .unwrap_or(encoding_rs::UTF_8);
        Some(decode_lossy(encoding, &bytes))
    }

    /// Replace the content with `text` as `text/<subtype>` in `charset`.
    ///
    /// Every `Content-*` header is dropped first. Line endings become `\n`
    /// and the text always ends with one. Characters `charset` cannot hold
    /// become `?`. A charset that is unknown or cannot be written is
    /// labeled `utf-8` instead. The transfer encoding is picked on output.
    pub fn set_text(&mut self, text: &str, subtype: &str, charset: &str) {
        let charset = charset.trim().to_ascii_lowercase();
        let (encoding, charset) = match lookup_charset(&charset) {
            Some(encoding) if can_encode(encoding) => (encoding, charset),
            _ => (encoding_rs::UTF_8, "utf-8".to_string()),
        };

        let mut normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        if !normalized.ends_with('\n') {
            normalized.push('\n');
        }

        self.headers.retain(|h| !h.is_content_header());
        self.add_header("Content-Type", ContentType::text(subtype, &charset).to_string());
        self.body = Body::Single(encode_lossy(encoding, &normalized));
    }

    /// Set `Content-Disposition: <disposition>; filename="..."`.
    pub fn set_disposition(&mut self, disposition: &str, filename: Option<&str>) {
        let value = match filename {
            Some(name) => format!("{disposition}; filename={}", quote(name)),
            None => disposition.to_string(),
        };
        self.set_header("Content-Disposition", value);
    }

    // ── Multipart promotion ────────────────────────────────────────

    /// Add an inline part, turning this part into `multipart/related`.
    pub fn add_related(&mut self, part: MimePart) -> Result<()> {
        self.add_multipart(MultipartKind::Related, part)
    }

    /// Add an alternative rendering, turning this part into `multipart/alternative`.
    pub fn add_alternative(&mut self, part: MimePart) -> Result<()> {
        self.add_multipart(MultipartKind::Alternative, part)
    }

    /// Add an attachment, turning this part into `multipart/mixed`.
    pub fn add_attachment(&mut self, part: MimePart) -> Result<()> {
        self.add_multipart(MultipartKind::Mixed, part)
    }

    fn add_multipart(&mut self, kind: MultipartKind, mut part: MimePart) -> Result<()> {
        let existing = self.multipart_kind();
        match existing.map(|e| e.cmp(&kind)) {
            Some(Ordering::Greater) => {
                return Err(RepairError::Promotion {
                    from: self.content_type().subtype,
                    to: kind.subtype().to_string(),
                });
            }
            Some(Ordering::Equal) if self.is_multipart() => {}
            _ => self.wrap(kind),
        }

        if let Some(disposition) = kind.default_disposition() {
            if part.get("Content-Disposition").is_none() {
                part.add_header("Content-Disposition", disposition);
            }
        }
        if let Body::Multipart(children) = &mut self.body {
            children.push(part);
        }
        Ok(())
    }

    /// The promotion kind declared by the `Content-Type`, if any.
    fn multipart_kind(&self) -> Option<MultipartKind> {
        let content_type = self.content_type();
        if content_type.is_multipart() {
            MultipartKind::from_subtype(&content_type.subtype)
        } else {
            None
        }
    }

    /// Move the `Content-*` headers and the body into a new first child
    /// and declare this part `multipart/<kind>`.
    fn wrap(&mut self, kind: MultipartKind) {
        let (content, kept): (Vec<Header>, Vec<Header>) = std::mem::take(&mut self.headers)
            .into_iter()
            .partition(Header::is_content_header);
        self.headers = kept;

        let body = std::mem::take(&mut self.body);
        let empty = matches!(&body, Body::Single(bytes) if bytes.is_empty());
        let children = if content.is_empty() && empty {
            Vec::new()
        } else {
            vec![MimePart::new(content, body)]
        };

        self.body = Body::Multipart(children);
        self.add_header("Content-Type", format!("multipart/{}", kind.subtype()));
    }
}
