//! Serializing a [`MimePart`] tree through `mail-builder`.
//!
//! Plain ASCII values go out as they are. Anything else is encoded by
//! `mail-builder`: address headers as addresses, so only the display names
//! become encoded words, other headers as unstructured text.
//! `Content-Type` and `Content-Disposition` are rebuilt from their
//! parameters, and multipart boundaries are left to `mail-builder`. Bodies
//! that still carry a `Content-Transfer-Encoding` are written as they are;
//! the rest are encoded on the way out. Lines end in `\n`.

use std::borrow::Cow;
use std::io::{self, Write};

use mail_builder::headers::address::Address;
use mail_builder::headers::content_type::ContentType as StructuredValue;
use mail_builder::headers::raw::Raw;
use mail_builder::headers::text::Text;
use mail_builder::headers::HeaderType;
use mail_builder::mime::{BodyPart, MimePart as OutputPart};
use mail_parser::{Address as ParsedAddress, Addr, MessageParser};

use crate::model::content_type::split_value;
use crate::model::{Body, ContentType, Header, HeaderValue, MimePart};

/// Headers holding address lists.
const ADDRESS_HEADERS: [&str; 6] = ["From", "To", "Cc", "Bcc", "Reply-To", "Sender"];

/// `mail-builder` matches these names case-sensitively.
const CONTENT_HEADERS: [&str; 3] = [
    "Content-Type",
    "Content-Disposition",
    "Content-Transfer-Encoding",
];

/// Serialize `part` to a byte vector.
pub fn message_to_bytes(part: &MimePart) -> Vec<u8> {
    let mut out = Vec::new();
    // Writing to a Vec cannot fail.
    let _ = write_message(part, &mut out);
    out
}

/// Serialize `part` into `out`.
pub fn write_message<W: Write>(part: &MimePart, out: &mut W) -> io::Result<()> {
    let mut wire = Vec::new();
    output_part(part).write_part(&mut wire)?;
    out.write_all(&unix_line_endings(&wire))
}

fn output_part(part: &MimePart) -> OutputPart<'static> {
    let multipart = part.is_multipart();
    let headers = part
        .headers()
        .iter()
        .map(|header| (header_name(header), header_value(header, multipart)))
        .collect();

    let contents = match part.body() {
        Body::Multipart(children) => BodyPart::Multipart(children.iter().map(output_part).collect()),
        // Without a Content-Type, `mail-builder` cannot tell text from
        // binary; a UTF-8 body is handed over as text.
        Body::Single(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) if part.get("Content-Type").is_none() => BodyPart::Text(text.to_string().into()),
            _ => BodyPart::Binary(bytes.clone().into()),
        },
    };

    OutputPart { headers, contents }
}

fn header_name(header: &Header) -> Cow<'static, str> {
    match CONTENT_HEADERS.iter().find(|name| header.is(name)) {
        Some(name) => Cow::Borrowed(*name),
        None => Cow::Owned(header.name.clone()),
    }
}

fn header_value(header: &Header, multipart: bool) -> HeaderType<'static> {
    if header.is("Content-Type") || header.is("Content-Disposition") {
        return structured_value(header, multipart);
    }

    match &header.value {
        HeaderValue::Raw(bytes) if bytes.is_ascii() => {
            Raw::new(String::from_utf8_lossy(bytes).trim().to_string()).into()
        }
        HeaderValue::Text(text) if text.is_ascii() => Raw::new(text.clone()).into(),
        value => {
            let text = value.decoded();
            let address = ADDRESS_HEADERS
                .iter()
                .any(|name| header.is(name))
                .then(|| address_value(&text))
                .flatten();
            match address {
                Some(address) => address.into(),
                None => Text::new(text).into(),
            }
        }
    }
}

/// `Content-Type` / `Content-Disposition` with their parameters re-encoded.
/// The boundary of a multipart part is dropped so a fresh one is picked.
fn structured_value(header: &Header, multipart: bool) -> HeaderType<'static> {
    let value = header.value.decoded();
    let (head, params) = split_value(&value);

    // RFC 2231 parameters are already in wire form.
    if !multipart && value.is_ascii() && params.iter().any(|(name, _)| name.ends_with('*')) {
        return Raw::new(value).into();
    }

    let head = if header.is("Content-Type") {
        ContentType::parse(&value).mime_type()
    } else {
        head.to_ascii_lowercase()
    };
    params
        .into_iter()
        .filter(|(name, _)| !(multipart && name == "boundary"))
        .fold(StructuredValue::new(head), |structured, (name, value)| {
            structured.attribute(name, value)
        })
        .into()
}

/// Parse an address list so it can be written with only the display names
/// encoded. `None` when any entry lacks an address.
fn address_value(value: &str) -> Option<Address<'static>> {
    let wrapped = format!("From: {value}\n\n");
    let message = MessageParser::default().parse(wrapped.as_bytes())?;

    let mut entries = match message.from()? {
        ParsedAddress::List(list) => list.iter().map(email_address).collect::<Option<Vec<_>>>()?,
        ParsedAddress::Group(groups) => groups
            .iter()
            .map(|group| {
                let members = group.addresses.iter().map(email_address).collect::<Option<Vec<_>>>()?;
                Some(Address::new_group(group.name.as_ref().map(|n| n.to_string()), members))
            })
            .collect::<Option<Vec<_>>>()?,
    };

    match entries.len() {
        0 => None,
        1 => entries.pop(),
        _ => Some(Address::new_list(entries)),
    }
}

fn email_address(addr: &Addr<'_>) -> Option<Address<'static>> {
    let email = addr.address()?.to_string();
    Some(Address::new_address(addr.name().map(str::to_string), email))
}

/// `mail-builder` writes CRLF; the mailbox uses bare `\n`.
fn unix_line_endings(wire: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(wire.len());
    let mut bytes = wire.iter().copied().peekable();
    while let Some(b) = bytes.next() {
        if b == b'\r' && bytes.peek() == Some(&b'\n') {
            continue;
        }
        out.push(b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mail_parser::MimeHeaders;

    fn written(part: &MimePart) -> String {
        String::from_utf8(message_to_bytes(part)).unwrap()
    }

    /// Every `boundary="..."` value declared in `text`.
    fn boundaries(text: &str) -> Vec<&str> {
        text.split("boundary=\"")
            .skip(1)
            .filter_map(|rest| rest.split('"').next())
            .collect()
    }

    #[test]
    fn test_single_part_layout() {
        let part = MimePart::new(
            vec![
                Header::new("Subject", "hi"),
                Header::new("X-Raw", HeaderValue::Raw(b"kept  as-is".to_vec())),
                Header::new("Content-Transfer-Encoding", "7bit"),
            ],
            Body::Single(b"body\n".to_vec()),
        );
        assert_eq!(
            written(&part),
            "Subject: hi\nX-Raw: kept  as-is\nContent-Transfer-Encoding: 7bit\n\nbody\n"
        );
    }

    #[test]
    fn test_text_body_encoded_on_write() {
        let part = MimePart::text("café au lait", "plain", "iso-8859-1");
        let text = written(&part);

        assert!(text.starts_with("Content-Type: text/plain; charset=\"iso-8859-1\"\n"));
        assert!(text.contains("Content-Transfer-Encoding: quoted-printable\n\ncaf=E9 au lait\n"));
        let parsed = MessageParser::default().parse(text.as_bytes()).unwrap();
        assert_eq!(parsed.body_text(0).unwrap().trim_end(), "café au lait");
    }

    #[test]
    fn test_multipart_layout() {
        let mut part = MimePart::text("one", "plain", "us-ascii");
        part.add_alternative(MimePart::text("<b>two</b>", "html", "us-ascii"))
            .unwrap();
        let text = written(&part);

        assert!(text.starts_with("Content-Type: multipart/alternative;"));
        let declared = boundaries(&text);
        assert_eq!(declared.len(), 1);
        let boundary = declared[0];
        assert_eq!(text.matches(&format!("\n--{boundary}\n")).count(), 2);
        assert!(text.ends_with(&format!("\n--{boundary}--\n")));
        assert!(!text.contains('\r'));

        let parsed = MessageParser::default().parse(text.as_bytes()).unwrap();
        assert_eq!(parsed.body_text(0).unwrap().trim_end(), "one");
        assert!(parsed.body_html(0).unwrap().contains("<b>two</b>"));
    }

    #[test]
    fn test_nested_boundaries_differ() {
        let mut part = MimePart::text("<p>x</p>", "html", "utf-8");
        part.add_related(MimePart::binary(b"GIF89a", "image/gif").unwrap())
            .unwrap();
        part.add_attachment(MimePart::binary(b"doc", "application/msword").unwrap())
            .unwrap();
        let text = written(&part);

        let declared = boundaries(&text);
        assert_eq!(declared.len(), 2);
        assert_ne!(declared[0], declared[1]);
        assert!(text.contains("Content-Type: image/gif\nContent-Disposition: inline\n"));
        assert!(text.contains("Content-Transfer-Encoding: base64\n\nR0lGODlh\n"));
    }

    #[test]
    fn test_stale_boundary_replaced() {
        let mut part = MimePart::new(
            vec![Header::new(
                "Content-Type",
                HeaderValue::Raw(b"multipart/mixed; boundary=old".to_vec()),
            )],
            Body::Multipart(Vec::new()),
        );
        part.add_attachment(MimePart::binary(b"doc", "application/msword").unwrap())
            .unwrap();
        let text = written(&part);

        assert!(!text.contains("boundary=\"old\""));
        assert_eq!(boundaries(&text).len(), 1);
    }

    #[test]
    fn test_address_display_name_keeps_address() {
        let part = MimePart::new(
            vec![
                Header::new("From", "\"Müller, Hans\" <hans@example.com>"),
                Header::new("To", "Zoë <zoe@example.com>, plain@example.com"),
                Header::new("Subject", "Grüße aus Köln"),
                Header::new("Content-Transfer-Encoding", "7bit"),
            ],
            Body::Single(b"hi\n".to_vec()),
        );
        let text = written(&part);
        assert!(text.is_ascii());
        assert!(text.contains("<hans@example.com>"));

        let parsed = MessageParser::default().parse(text.as_bytes()).unwrap();
        let from = parsed.from().unwrap().first().unwrap();
        assert_eq!(from.name(), Some("Müller, Hans"));
        assert_eq!(from.address(), Some("hans@example.com"));

        let to: Vec<(Option<&str>, Option<&str>)> = parsed
            .to()
            .unwrap()
            .iter()
            .map(|addr| (addr.name(), addr.address()))
            .collect();
        assert_eq!(
            to,
            vec![
                (Some("Zoë"), Some("zoe@example.com")),
                (None, Some("plain@example.com")),
            ]
        );
        assert_eq!(parsed.subject(), Some("Grüße aus Köln"));
    }

    #[test]
    fn test_unparseable_address_written_as_text() {
        let part = MimePart::new(
            vec![
                Header::new("From", "Jörg ohne Adresse"),
                Header::new("Content-Transfer-Encoding", "7bit"),
            ],
            Body::Single(b"hi\n".to_vec()),
        );
        let text = written(&part);
        assert!(text.starts_with("From: =?utf-8?"));
        assert!(text.is_ascii());
    }

    #[test]
    fn test_raw_8bit_header_encoded() {
        let part = MimePart::new(
            vec![
                Header::new("Subject", HeaderValue::Raw(b"caf\xe9 au lait".to_vec())),
                Header::new("Content-Transfer-Encoding", "7bit"),
            ],
            Body::Single(b"hi\n".to_vec()),
        );
        let text = written(&part);
        assert!(text.is_ascii());
        let parsed = MessageParser::default().parse(text.as_bytes()).unwrap();
        assert_eq!(parsed.subject(), Some("café au lait"));
    }

    #[test]
    fn test_non_ascii_filename_round_trips() {
        let mut part = MimePart::text("see file", "plain", "utf-8");
        let mut doc = MimePart::binary(b"doc", "application/msword").unwrap();
        doc.set_disposition("attachment", Some("résumé.doc"));
        part.add_attachment(doc).unwrap();
        let text = written(&part);
        assert!(text.is_ascii());

        let parsed = MessageParser::default().parse(text.as_bytes()).unwrap();
        let names: Vec<&str> = parsed
            .attachments()
            .filter_map(|a| a.attachment_name())
            .collect();
        assert_eq!(names, vec!["résumé.doc"]);
    }

    #[test]
    fn test_lowercase_transfer_encoding_body_kept() {
        let part = MimePart::new(
            vec![
                Header::new("content-type", "text/plain; charset=utf-8"),
                Header::new("content-transfer-encoding", "base64"),
            ],
            Body::Single(b"aGk=\n".to_vec()),
        );
        assert_eq!(
            written(&part),
            "Content-Type: text/plain; charset=\"utf-8\"\n\
Content-Transfer-Encoding: base64\n\naGk=\n"
        );
    }

    #[test]
    fn test_rfc2231_parameter_kept() {
        let part = MimePart::new(
            vec![
                Header::new(
                    "Content-Disposition",
                    HeaderValue::Raw(b"attachment; filename*=utf-8''r%C3%A9sum%C3%A9.doc".to_vec()),
                ),
                Header::new("Content-Type", "application/msword"),
                Header::new("Content-Transfer-Encoding", "base64"),
            ],
            Body::Single(b"ZG9j\n".to_vec()),
        );
        assert!(written(&part)
            .starts_with("Content-Disposition: attachment; filename*=utf-8''r%C3%A9sum%C3%A9.doc\n"));
    }

    #[test]
    fn test_unix_line_endings() {
        assert_eq!(unix_line_endings(b"a\r\nb\rc\r\n"), b"a\nb\rc\n".to_vec());
    }
}
