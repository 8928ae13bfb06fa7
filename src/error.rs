//! Centralized error types for eudora2tbird.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the eudora2tbird library.
///
/// Only the first three variants abort a run. The rest describe a single
/// header, file or structural step and are turned into diagnostics by the
/// repair pipeline.
#[derive(Error, Debug)]
pub enum RepairError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The first line of the mailbox is not an Eudora Rescue separator.
    #[error("'{0}' does not start with a 'From ???@??? ' separator line")]
    MissingSentinel(PathBuf),

    /// A header value could not be decoded (lone UTF-16 surrogate).
    #[error("Header '{name}' holds an undecodable value")]
    InvalidHeader { name: String },

    /// A sniffed or declared MIME type is not of the form `type/subtype`.
    #[error("Invalid MIME type: {0}")]
    InvalidMimeType(String),

    /// A multipart promotion that would nest the structure backwards.
    #[error("Cannot convert multipart/{from} to multipart/{to}")]
    Promotion { from: String, to: String },

    /// A marker needs a directory that was not configured.
    #[error("No {0} directory configured")]
    MissingDirectory(&'static str),
}

/// Convenience alias for `Result<T, RepairError>`.
pub type Result<T> = std::result::Result<T, RepairError>;

impl RepairError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Like [`RepairError::io`], but maps `NotFound` to [`RepairError::FileNotFound`].
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound(path)
        } else {
            Self::io(path, source)
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare; prefer `RepairError::io`).
impl From<std::io::Error> for RepairError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_maps_not_found() {
        let err = RepairError::open(
            "missing.mbox",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, RepairError::FileNotFound(_)));

        let err = RepairError::open(
            "locked.mbox",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, RepairError::Io { .. }));
    }

    #[test]
    fn test_promotion_message() {
        let err = RepairError::Promotion {
            from: "alternative".into(),
            to: "related".into(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot convert multipart/alternative to multipart/related"
        );
    }
}
