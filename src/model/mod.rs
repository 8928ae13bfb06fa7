//! Core data model: headers, content types, MIME parts and content markers.

pub mod content_type;
pub mod header;
pub mod marker;
pub mod part;

pub use content_type::ContentType;
pub use header::{Header, HeaderValue};
pub use marker::{ContentMarker, ExternalFile};
pub use part::{Body, MimePart, MultipartKind};
