//! Turning `Embedded Content:` and `Attachment Converted:` markers back into
//! MIME parts built from the files Eudora saved to disk.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{RepairError, Result};
use crate::model::{ContentMarker, ExternalFile, MimePart};
use crate::report::{RepairEvent, Reporter};

const EMBEDDED_TAG: &str = "\nEmbedded Content: ";
const ATTACHMENT_TAG: &str = "\nAttachment Converted: ";

static CONTENT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""cid:(.+?)""#).expect("valid cid pattern"));
static EMBEDDED_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\nEmbedded Content: (.+):").expect("valid embedded pattern"));
static ATTACHMENT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\nAttachment Converted: "(.+)""#).expect("valid attachment pattern")
});

/// Pair the body's content ids with its embedded file names, by position.
///
/// Content ids are deduplicated keeping first-seen order; names keep
/// duplicates. A count mismatch is reported and the extra entries dropped.
pub fn embedded_markers(body: &str, reporter: &mut dyn Reporter) -> Vec<ContentMarker> {
    if !body.contains(EMBEDDED_TAG) {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let content_ids: Vec<&str> = CONTENT_ID
        .captures_iter(body)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .filter(|id| seen.insert(*id))
        .collect();
    let names: Vec<&str> = EMBEDDED_NAME
        .captures_iter(body)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    if content_ids.len() > names.len() {
        reporter.report(RepairEvent::MoreContentIds {
            content_ids: content_ids.len(),
            names: names.len(),
        });
    } else if content_ids.len() < names.len() {
        reporter.report(RepairEvent::MoreEmbeddedObjects {
            content_ids: content_ids.len(),
            names: names.len(),
        });
    }

    content_ids
        .into_iter()
        .zip(names)
        .map(|(content_id, filename)| ContentMarker::Embedded {
            content_id: content_id.to_string(),
            filename: filename.to_string(),
        })
        .collect()
}

/// Attachment markers of the body, reduced to file basenames.
pub fn attachment_markers(body: &str) -> Vec<ContentMarker> {
    if !body.contains(ATTACHMENT_TAG) {
        return Vec::new();
    }
    ATTACHMENT_PATH
        .captures_iter(body)
        .filter_map(|c| c.get(1))
        .map(|m| ContentMarker::Attachment {
            filename: basename(m.as_str()).to_string(),
        })
        .collect()
}

/// Last path segment after either `\` or `/`.
pub fn basename(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}

/// Attach every embedded file as an inline `multipart/related` part.
/// Returns the number of files embedded.
pub fn embed_files(
    message: &mut MimePart,
    body: &str,
    dir: Option<&Path>,
    reporter: &mut dyn Reporter,
) -> usize {
    let mut embedded = 0;
    for marker in embedded_markers(body, reporter) {
        let ContentMarker::Embedded {
            content_id,
            filename,
        } = marker
        else {
            continue;
        };
        match embed_one(message, dir, &content_id, &filename) {
            Ok(()) => {
                embedded += 1;
                reporter.report(RepairEvent::Embedded {
                    filename,
                    content_id,
                });
            }
            Err(err) => reporter.report(RepairEvent::EmbedFailed {
                filename,
                reason: err.to_string(),
            }),
        }
    }
    embedded
}

fn embed_one(
    message: &mut MimePart,
    dir: Option<&Path>,
    content_id: &str,
    filename: &str,
) -> Result<()> {
    let dir = dir.ok_or(RepairError::MissingDirectory("embed"))?;
    let file = ExternalFile::load(dir, filename)?;
    let mut part = MimePart::binary(&file.data, &file.mime_type)?;
    part.set_disposition("inline", Some(filename));
    part.add_header("Content-ID", format!("<{content_id}>"));
    message.add_related(part)
}

/// Attach every converted attachment as a `multipart/mixed` part.
/// Returns the number of files attached.
pub fn attach_files(
    message: &mut MimePart,
    body: &str,
    dir: Option<&Path>,
    reporter: &mut dyn Reporter,
) -> usize {
    let mut attached = 0;
    for marker in attachment_markers(body) {
        let filename = marker.filename().to_string();
        match attach_one(message, dir, &filename) {
            Ok(()) => {
                attached += 1;
                reporter.report(RepairEvent::Attached { filename });
            }
            Err(err) => reporter.report(RepairEvent::AttachFailed {
                filename,
                reason: err.to_string(),
            }),
        }
    }
    attached
}

fn attach_one(message: &mut MimePart, dir: Option<&Path>, filename: &str) -> Result<()> {
    let dir = dir.ok_or(RepairError::MissingDirectory("attachment"))?;
    let file = ExternalFile::load(dir, filename)?;
    let mut part = MimePart::binary(&file.data, &file.mime_type)?;
    part.set_disposition("attachment", Some(filename));
    message.add_attachment(part)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_pair_by_position() {
        let body = "<img src=\"cid:abc\"><img src=\"cid:xyz\"><img src=\"cid:abc\">\n\
Embedded Content: pic1.jpg: 00000001,4f3a\n\
Embedded Content: pic2.png: 00000002,4f3b\n";
        let mut events: Vec<RepairEvent> = Vec::new();
        let markers = embedded_markers(body, &mut events);
        assert_eq!(
            markers,
            vec![
                ContentMarker::Embedded {
                    content_id: "abc".into(),
                    filename: "pic1.jpg".into()
                },
                ContentMarker::Embedded {
                    content_id: "xyz".into(),
                    filename: "pic2.png".into()
                },
            ]
        );
        assert!(events.is_empty());
    }

    #[test]
    fn test_markers_simple_names() {
        let body = "\"cid:abc\" \"cid:xyz\"\nEmbedded Content: pic1.jpg:\nEmbedded Content: pic2.png:\n";
        let mut events: Vec<RepairEvent> = Vec::new();
        let names: Vec<_> = embedded_markers(body, &mut events)
            .iter()
            .map(|m| m.filename().to_string())
            .collect();
        assert_eq!(names, vec!["pic1.jpg", "pic2.png"]);
    }

    #[test]
    fn test_more_content_ids_reported() {
        let body = "\"cid:a\" \"cid:b\" \"cid:c\"\nEmbedded Content: one.jpg:\nEmbedded Content: two.jpg:\n";
        let mut events: Vec<RepairEvent> = Vec::new();
        let markers = embedded_markers(body, &mut events);
        assert_eq!(markers.len(), 2);
        assert_eq!(
            events,
            vec![RepairEvent::MoreContentIds {
                content_ids: 3,
                names: 2
            }]
        );
    }

    #[test]
    fn test_more_embedded_objects_reported() {
        let body = "\"cid:a\"\nEmbedded Content: one.jpg:\nEmbedded Content: two.jpg:\n";
        let mut events: Vec<RepairEvent> = Vec::new();
        assert_eq!(embedded_markers(body, &mut events).len(), 1);
        assert!(matches!(events[0], RepairEvent::MoreEmbeddedObjects { .. }));
    }

    #[test]
    fn test_no_tag_no_markers() {
        let mut events: Vec<RepairEvent> = Vec::new();
        assert!(embedded_markers("\"cid:a\" only", &mut events).is_empty());
        assert!(attachment_markers("Attachment Converted: \"x\"").is_empty());
    }

    #[test]
    fn test_attachment_basename() {
        let body = "text\nAttachment Converted: \"C:\\Users\\me\\report.doc\"\n\
Attachment Converted: \"/home/me/notes.txt\"\n";
        let names: Vec<_> = attachment_markers(body)
            .iter()
            .map(|m| m.filename().to_string())
            .collect();
        assert_eq!(names, vec!["report.doc", "notes.txt"]);
        assert_eq!(basename("plain.txt"), "plain.txt");
    }

    #[test]
    fn test_embed_and_attach_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pic.png"), b"\x89PNG\r\n\x1a\n0000").unwrap();
        std::fs::write(dir.path().join("report.doc"), b"report body").unwrap();

        let body = "<img src=\"cid:p1\">\nEmbedded Content: pic.png:\n\
Attachment Converted: \"C:\\x\\report.doc\"\nAttachment Converted: \"C:\\x\\gone.doc\"\n";
        let mut message = MimePart::text("<img src=\"cid:p1\">", "html", "utf-8");
        let mut events: Vec<RepairEvent> = Vec::new();

        assert_eq!(embed_files(&mut message, body, Some(dir.path()), &mut events), 1);
        assert_eq!(attach_files(&mut message, body, Some(dir.path()), &mut events), 1);

        assert_eq!(message.content_type().mime_type(), "multipart/mixed");
        let related = &message.children()[0];
        assert_eq!(related.content_type().mime_type(), "multipart/related");
        let image = &related.children()[1];
        assert_eq!(image.get("Content-ID").as_deref(), Some("<p1>"));
        assert_eq!(
            image.get("Content-Disposition").as_deref(),
            Some("inline; filename=\"pic.png\"")
        );
        assert_eq!(image.decoded_body(), Some(b"\x89PNG\r\n\x1a\n0000".to_vec()));

        let attachment = &message.children()[1];
        assert_eq!(
            attachment.get("Content-Disposition").as_deref(),
            Some("attachment; filename=\"report.doc\"")
        );
        assert!(events
            .iter()
            .any(|e| matches!(e, RepairEvent::AttachFailed { filename, .. } if filename == "gone.doc")));
    }

    #[test]
    fn test_missing_directory_fails_per_file() {
        let body = "\nAttachment Converted: \"a.doc\"\nAttachment Converted: \"b.doc\"\n";
        let mut message = MimePart::text("x", "plain", "utf-8");
        let mut events: Vec<RepairEvent> = Vec::new();
        assert_eq!(attach_files(&mut message, body, None, &mut events), 0);
        assert_eq!(events.len(), 2);
        assert!(!message.is_multipart());
    }
}
