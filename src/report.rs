//! Diagnostics emitted while repairing messages.
//!
//! The repair pipeline never prints. Every condition worth telling the user
//! about becomes a [`RepairEvent`] handed to a [`Reporter`].

use std::fmt;

use tracing::{error, info, warn};

/// How serious a [`RepairEvent`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Something the pipeline changed, guessed or failed to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairEvent {
    /// A line rewrite rule fired.
    LineRepaired {
        rule: &'static str,
        original: String,
        repaired: String,
    },
    /// No `Date` header; the raw `Date:` line remainder is used instead.
    DateFallback { value: Option<String> },
    /// Neither the header nor the fallback parsed; the 1900 sentinel is used.
    InvalidDate { value: Option<String> },
    /// A `From` header could not be sanitized and was replaced.
    HeaderFailed { name: String, replacement: String },
    /// The declared charset is unknown and was replaced by `utf-8`.
    InvalidCharset { charset: String },
    /// The declared charset decodes but cannot encode (UTF-16); the body was
    /// decoded once and relabeled `utf-8`.
    CharsetNotEncodable { charset: String },
    /// UTF-8 bytes were found in a body declared in another charset.
    UnicodeTextFound { charset: String },
    /// The body is multipart or not text and was passed through unchanged.
    BodyLeftAsIs { content_type: String },
    HtmlExtracted,
    FlowedExtracted,
    MoreContentIds { content_ids: usize, names: usize },
    MoreEmbeddedObjects { content_ids: usize, names: usize },
    Embedded { filename: String, content_id: String },
    EmbedFailed { filename: String, reason: String },
    Attached { filename: String },
    AttachFailed { filename: String, reason: String },
    /// The plain-text alternative could not be added.
    AlternativeFailed { reason: String },
}

impl RepairEvent {
    pub fn severity(&self) -> Severity {
        match self {
            RepairEvent::LineRepaired { .. }
            | RepairEvent::DateFallback { .. }
            | RepairEvent::UnicodeTextFound { .. }
            | RepairEvent::BodyLeftAsIs { .. }
            | RepairEvent::HtmlExtracted
            | RepairEvent::FlowedExtracted
            | RepairEvent::Embedded { .. }
            | RepairEvent::Attached { .. } => Severity::Info,
            RepairEvent::InvalidDate { .. }
            | RepairEvent::HeaderFailed { .. }
            | RepairEvent::InvalidCharset { .. }
            | RepairEvent::CharsetNotEncodable { .. }
            | RepairEvent::MoreContentIds { .. }
            | RepairEvent::MoreEmbeddedObjects { .. } => Severity::Warning,
            RepairEvent::EmbedFailed { .. }
            | RepairEvent::AttachFailed { .. }
            | RepairEvent::AlternativeFailed { .. } => Severity::Error,
        }
    }
}

fn or_none(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("<None>")
}

impl fmt::Display for RepairEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepairEvent::LineRepaired {
                rule,
                original,
                repaired,
            } => write!(
                f,
                "Line modified ({rule}): {:?} -> {:?}",
                original.trim_end(),
                repaired.trim_end()
            ),
            RepairEvent::DateFallback { value } => {
                write!(f, "Falling back to date: {}", or_none(value))
            }
            RepairEvent::InvalidDate { value } => write!(f, "Invalid date: {}", or_none(value)),
            RepairEvent::HeaderFailed { name, replacement } => {
                write!(f, "Failed with header: {name} (replaced by {replacement})")
            }
            RepairEvent::InvalidCharset { charset } => write!(f, "Invalid charset: {charset}"),
            RepairEvent::CharsetNotEncodable { charset } => {
                write!(f, "Charset {charset} cannot be written back, converted to utf-8")
            }
            RepairEvent::UnicodeTextFound { charset } => {
                write!(f, "Unicode text found in {charset} body")
            }
            RepairEvent::BodyLeftAsIs { content_type } => {
                write!(f, "Body of type {content_type} left as is")
            }
            RepairEvent::HtmlExtracted => f.write_str("Extracted <x-html> content"),
            RepairEvent::FlowedExtracted => f.write_str("Extracted <x-flowed> content"),
            RepairEvent::MoreContentIds { content_ids, names } => write!(
                f,
                "More ContentIDs than Embedded Objects ({content_ids} > {names})"
            ),
            RepairEvent::MoreEmbeddedObjects { content_ids, names } => write!(
                f,
                "More Embedded Objects than ContentIDs ({names} > {content_ids})"
            ),
            RepairEvent::Embedded {
                filename,
                content_id,
            } => write!(f, "Embedding... {filename} ({content_id})"),
            RepairEvent::EmbedFailed { filename, reason } => {
                write!(f, "Error adding embedded file {filename}: {reason}")
            }
            RepairEvent::Attached { filename } => write!(f, "Attaching... {filename}"),
            RepairEvent::AttachFailed { filename, reason } => {
                write!(f, "Error adding attachment {filename}: {reason}")
            }
            RepairEvent::AlternativeFailed { reason } => {
                write!(f, "Error adding plain-text alternative: {reason}")
            }
        }
    }
}

/// Receives repair diagnostics.
pub trait Reporter {
    fn report(&mut self, event: RepairEvent);
}

/// Collects events, mostly for tests and statistics.
impl Reporter for Vec<RepairEvent> {
    fn report(&mut self, event: RepairEvent) {
        self.push(event);
    }
}

/// Logs each event through `tracing` at its severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&mut self, event: RepairEvent) {
        match event.severity() {
            Severity::Info => info!("{event}"),
            Severity::Warning => warn!("{event}"),
            Severity::Error => error!("{event}"),
        }
    }
}

/// Forwards to an inner reporter while counting events by severity.
pub struct CountingReporter<'a> {
    inner: &'a mut dyn Reporter,
    pub warnings: u64,
    pub errors: u64,
}

impl<'a> CountingReporter<'a> {
    pub fn new(inner: &'a mut dyn Reporter) -> Self {
        Self {
            inner,
            warnings: 0,
            errors: 0,
        }
    }
}

impl Reporter for CountingReporter<'_> {
    fn report(&mut self, event: RepairEvent) {
        match event.severity() {
            Severity::Info => {}
            Severity::Warning => self.warnings += 1,
            Severity::Error => self.errors += 1,
        }
        self.inner.report(event);
    }
}
