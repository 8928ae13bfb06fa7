//! Resolving the date used for a message's separator line.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use crate::model::MimePart;
use crate::parser::header::parse_date;
use crate::report::{RepairEvent, Reporter};

/// Date used when nothing parses: 1 Jan 1900 00:00:00 +0000.
pub static SENTINEL_DATE: LazyLock<DateTime<FixedOffset>> = LazyLock::new(|| {
    Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0)
        .single()
        .expect("valid sentinel date")
        .fixed_offset()
});

/// The message's own `Date` header, else the raw fallback, else the sentinel.
///
/// Reports `DateFallback` when the header is missing and `InvalidDate` when
/// the sentinel is used.
pub fn resolve_date(
    message: &MimePart,
    fallback: Option<&str>,
    reporter: &mut dyn Reporter,
) -> DateTime<FixedOffset> {
    let value = match message.get("Date") {
        Some(value) => Some(value),
        None => {
            reporter.report(RepairEvent::DateFallback {
                value: fallback.map(str::to_string),
            });
            fallback.map(str::to_string)
        }
    };

    match value.as_deref().and_then(parse_date) {
        Some(date) => date,
        None => {
            reporter.report(RepairEvent::InvalidDate { value });
            *SENTINEL_DATE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::message::parse_message;

    #[test]
    fn test_own_header_wins() {
        let message = parse_message(b"Date: Tue, 3 Feb 1998 10:00:00 -0500\n\n");
        let mut events: Vec<RepairEvent> = Vec::new();
        let date = resolve_date(&message, Some("Mon, 1 Jan 2001 00:00:00 +0000"), &mut events);
        assert_eq!(date.to_rfc3339(), "1998-02-03T10:00:00-05:00");
        assert!(events.is_empty());
    }

    #[test]
    fn test_fallback_used() {
        let message = parse_message(b"Subject: x\n\n");
        let mut events: Vec<RepairEvent> = Vec::new();
        let date = resolve_date(&message, Some("Mon, 1 Jan 2001 12:30:00 +0100"), &mut events);
        assert_eq!(date.to_rfc3339(), "2001-01-01T12:30:00+01:00");
        assert_eq!(
            events,
            vec![RepairEvent::DateFallback {
                value: Some("Mon, 1 Jan 2001 12:30:00 +0100".into())
            }]
        );
    }

    #[test]
    fn test_unparseable_fallback_gives_sentinel() {
        let message = parse_message(b"Subject: x\n\n");
        let mut events: Vec<RepairEvent> = Vec::new();
        let date = resolve_date(&message, Some("not-a-date"), &mut events);
        assert_eq!(date, *SENTINEL_DATE);
        assert_eq!(date.format("%Y-%m-%d %H:%M:%S").to_string(), "1900-01-01 00:00:00");
        assert!(matches!(events[1], RepairEvent::InvalidDate { .. }));
    }

    #[test]
    fn test_nothing_at_all_gives_sentinel() {
        let message = parse_message(b"\n");
        let mut events: Vec<RepairEvent> = Vec::new();
        assert_eq!(resolve_date(&message, None, &mut events), *SENTINEL_DATE);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], RepairEvent::InvalidDate { value: None });
    }
}
