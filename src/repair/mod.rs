//! The per-message repair pipeline.
//!
//! Stages run in a fixed order: date resolution, header sanitizing, charset
//! normalization, `<x-html>` extraction, embedding, the `<x-flowed>`
//! alternative, then attachments. Each stage reports what it did; none of
//! them can abort the run.

pub mod charset;
pub mod date;
pub mod headers;
pub mod markup;
pub mod reattach;

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};

use crate::model::MimePart;
use crate::parser::Frame;
use crate::report::{RepairEvent, Reporter};

use self::markup::Markup;

/// Address put in a `From` header that could not be sanitized.
pub const DEFAULT_FAILED_FROM: &str = "<failed@conversion.time>";

/// Settings for [`repair_frame`].
#[derive(Debug, Clone)]
pub struct RepairOptions {
    /// Directory holding converted attachments.
    pub attach_dir: Option<PathBuf>,
    /// Directory holding embedded (inline) objects.
    pub embed_dir: Option<PathBuf>,
    pub failed_from_address: String,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            attach_dir: None,
            embed_dir: None,
            failed_from_address: DEFAULT_FAILED_FROM.to_string(),
        }
    }
}

/// One-line description of a repaired message: `from -- date -- subject`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    pub from: String,
    pub date: DateTime<FixedOffset>,
    pub subject: String,
}

impl MessageSummary {
    fn new(message: &MimePart, date: DateTime<FixedOffset>) -> Self {
        Self {
            from: message.get("From").unwrap_or_else(|| "<None>".to_string()),
            date,
            subject: message.get("Subject").unwrap_or_else(|| "<None>".to_string()),
        }
    }
}

impl fmt::Display for MessageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -- {} -- {}",
            self.from,
            self.date.format("%Y-%m-%d %H:%M:%S%:z"),
            self.subject
        )
    }
}

/// A message ready to be written.
#[derive(Debug, Clone)]
pub struct RepairedMessage {
    pub message: MimePart,
    /// Date for the separator line.
    pub date: DateTime<FixedOffset>,
    pub summary: MessageSummary,
    pub embedded: usize,
    pub attached: usize,
}

/// Run every repair stage over one frame.
pub fn repair_frame(
    frame: Frame,
    options: &RepairOptions,
    reporter: &mut dyn Reporter,
) -> RepairedMessage {
    let Frame {
        mut message,
        date_fallback,
        repairs,
        ..
    } = frame;

    for repair in repairs {
        reporter.report(RepairEvent::LineRepaired {
            rule: repair.rule,
            original: String::from_utf8_lossy(&repair.original).into_owned(),
            repaired: String::from_utf8_lossy(&repair.repaired).into_owned(),
        });
    }

    let date = date::resolve_date(&message, date_fallback.as_deref(), reporter);
    headers::sanitize_headers(&mut message, &options.failed_from_address, reporter);
    let summary = MessageSummary::new(&message, date);

    let mut embedded = 0;
    let mut attached = 0;
    if let Some(body) = charset::normalize_charset(&mut message, reporter) {
        let markup = Markup::extract(&body);

        if let Some(html) = &markup.html {
            message.set_text(html, "html", charset::DEFAULT_CHARSET);
            reporter.report(RepairEvent::HtmlExtracted);
        }

        embedded = reattach::embed_files(&mut message, &body, options.embed_dir.as_deref(), reporter);

        if let Some(flowed) = &markup.flowed {
            let plain = MimePart::text(flowed, "plain", charset::DEFAULT_CHARSET);
            match message.add_alternative(plain) {
                Ok(()) => reporter.report(RepairEvent::FlowedExtracted),
                Err(err) => reporter.report(RepairEvent::AlternativeFailed {
                    reason: err.to_string(),
                }),
            }
        }

        attached = reattach::attach_files(&mut message, &body, options.attach_dir.as_deref(), reporter);
    }

    RepairedMessage {
        message,
        date,
        summary,
        embedded,
        attached,
    }
}
