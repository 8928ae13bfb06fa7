//! `Content-Type` values: `maintype/subtype` plus ordered parameters.

use std::fmt;

/// A parsed `Content-Type`.
///
/// Parsing is lenient: a missing or malformed type (no `/`) reads as
/// `text/plain`, the way permissive mail parsers treat it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    pub maintype: String,
    pub subtype: String,
    params: Vec<(String, String)>,
}

impl Default for ContentType {
    fn default() -> Self {
        Self::new("text", "plain")
    }
}

impl ContentType {
    pub fn new(maintype: &str, subtype: &str) -> Self {
        Self {
            maintype: maintype.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params: Vec::new(),
        }
    }

    /// `text/<subtype>; charset="<charset>"`.
    pub fn text(subtype: &str, charset: &str) -> Self {
        let mut ct = Self::new("text", subtype);
        ct.set_param("charset", charset);
        ct
    }

    /// Parse a `type/subtype` string such as a sniffed MIME type.
    /// Returns `None` unless both halves are present.
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        let (main, sub) = mime_type.trim().split_once('/')?;
        if main.is_empty() || sub.is_empty() || sub.contains('/') {
            return None;
        }
        Some(Self::new(main, sub))
    }

    /// Parse a header value.
    pub fn parse(value: &str) -> Self {
        let (type_part, params) = split_value(value);
        let mut ct = Self::from_mime_type(&type_part)
            .filter(|ct| ct.maintype.chars().all(is_token_char) && ct.subtype.chars().all(is_token_char))
            .unwrap_or_default();
        ct.params = params;
        ct
    }

    /// `maintype/subtype`.
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.maintype, self.subtype)
    }

    pub fn is_multipart(&self) -> bool {
        self.maintype == "multipart"
    }

    pub fn is_text(&self) -> bool {
        self.maintype == "text"
    }

    /// Parameters in header order, names lowercased.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Parameter value by case-insensitive name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace a parameter in place, or append it.
    pub fn set_param(&mut self, name: &str, value: &str) {
        match self.params.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.params.push((name.to_ascii_lowercase(), value.to_string())),
        }
    }

    /// The lowercased `charset` parameter.
    pub fn charset(&self) -> Option<String> {
        self.param("charset")
            .map(|c| c.trim().to_ascii_lowercase())
            .filter(|c| !c.is_empty())
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.maintype, self.subtype)?;
        for (name, value) in &self.params {
            write!(f, "; {}={}", name, quote(value))?;
        }
        Ok(())
    }
}

/// `value` as a quoted string.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Split a structured value such as `attachment; filename="a.doc"` into
/// its leading token and its parameters. Parameter names are lowercased and
/// values unquoted; segments without `=` are dropped.
pub fn split_value(value: &str) -> (String, Vec<(String, String)>) {
    let mut segments = split_params(value).into_iter();
    let head = segments.next().unwrap_or_default().trim().to_string();
    let params = segments
        .filter_map(|segment| {
            let (name, val) = segment.split_once('=')?;
            let name = name.trim().to_ascii_lowercase();
            (!name.is_empty()).then(|| (name, unquote(val.trim())))
        })
        .collect();
    (head, params)
}

/// RFC 2045 token characters.
fn is_token_char(c: char) -> bool {
    c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?=".contains(c)
}

/// Split on `;` outside quoted strings.
fn split_params(value: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in value.chars() {
        match ch {
            _ if escaped => {
                current.push(ch);
                escaped = false;
            }
            '\\' if in_quotes => {
                current.push(ch);
                escaped = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ';' if !in_quotes => segments.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    segments.push(current);
    segments
}

/// Strip surrounding double quotes and undo backslash escapes.
fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"') else {
        return value.to_string();
    };
    let inner = inner.strip_suffix('"').unwrap_or(inner);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_charset() {
        let ct = ContentType::parse("Text/Plain; charset=\"ISO-8859-1\"; format=flowed");
        assert_eq!(ct.mime_type(), "text/plain");
        assert_eq!(ct.charset().as_deref(), Some("iso-8859-1"));
        assert_eq!(ct.param("FORMAT"), Some("flowed"));
    }

    #[test]
    fn test_parse_malformed_defaults_to_text_plain() {
        let ct = ContentType::parse(" boundary=\"----=_NextPart_000\"");
        assert_eq!(ct.mime_type(), "text/plain");
        assert_eq!(ct.charset(), None);

        assert_eq!(ContentType::parse("").mime_type(), "text/plain");
        assert_eq!(ContentType::parse("garbage").mime_type(), "text/plain");
    }

    #[test]
    fn test_parse_quoted_semicolon() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"a;b\"; charset=us-ascii");
        assert!(ct.is_multipart());
        assert_eq!(ct.param("boundary"), Some("a;b"));
        assert_eq!(ct.charset().as_deref(), Some("us-ascii"));
    }

    #[test]
    fn test_display_quotes_params() {
        let mut ct = ContentType::text("plain", "bogus-xyz");
        ct.set_param("charset", "utf-8");
        assert_eq!(ct.to_string(), "text/plain; charset=\"utf-8\"");
    }

    #[test]
    fn test_split_disposition() {
        let (head, params) = split_value("Attachment; FILENAME=\"a; b.doc\"; size=12; junk");
        assert_eq!(head, "Attachment");
        assert_eq!(
            params,
            vec![
                ("filename".to_string(), "a; b.doc".to_string()),
                ("size".to_string(), "12".to_string()),
            ]
        );
    }

    #[test]
    fn test_from_mime_type() {
        assert_eq!(
            ContentType::from_mime_type("image/png").map(|c| c.mime_type()),
            Some("image/png".to_string())
        );
        assert!(ContentType::from_mime_type("all/all/all").is_none());
        assert!(ContentType::from_mime_type("octet-stream").is_none());
    }
}
