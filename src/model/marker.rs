//! Placeholders left in recovered bodies for content split out to disk,
//! and the files they resolve to.
//!
//! File contents are read only when a marker is resolved, then moved into
//! the message being repaired.

use std::path::{Path, PathBuf};

use crate::error::{RepairError, Result};

/// A reference to content that lives outside the mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentMarker {
    /// An inline object referenced from HTML as `cid:<content_id>`.
    Embedded { content_id: String, filename: String },
    /// A converted attachment, already reduced to its basename.
    Attachment { filename: String },
}

impl ContentMarker {
    pub fn filename(&self) -> &str {
        match self {
            ContentMarker::Embedded { filename, .. } | ContentMarker::Attachment { filename } => {
                filename
            }
        }
    }
}

/// A file from the embed or attachment directory.
#[derive(Debug, Clone)]
pub struct ExternalFile {
    /// Full path that was read.
    pub path: PathBuf,
    /// Sniffed MIME type, e.g. `"image/jpeg"`.
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ExternalFile {
    /// Read `dir/filename` and sniff its type from the content.
    pub fn load(dir: &Path, filename: &str) -> Result<Self> {
        let path = dir.join(filename);
        let data = std::fs::read(&path).map_err(|e| RepairError::open(&path, e))?;
        let mime_type = tree_magic::from_u8(&data);
        Ok(Self {
            path,
            mime_type,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_reads_and_sniffs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"plain words\n").unwrap();

        let file = ExternalFile::load(dir.path(), "notes.txt").unwrap();
        assert_eq!(file.data, b"plain words\n");
        assert_eq!(file.mime_type, tree_magic::from_u8(b"plain words\n"));
        assert!(file.mime_type.contains('/'));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ExternalFile::load(dir.path(), "gone.jpg").unwrap_err();
        assert!(matches!(err, RepairError::FileNotFound(_)));
    }

    #[test]
    fn test_marker_filename() {
        let marker = ContentMarker::Embedded {
            content_id: "abc".into(),
            filename: "pic1.jpg".into(),
        };
        assert_eq!(marker.filename(), "pic1.jpg");
    }
}
