//! Header value decoding: RFC 2047 encoded words and RFC 2822 style dates.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use regex::Regex;
use tracing::debug;

use crate::codec::{decode_base64, decode_lossy, lookup_charset};

static ENCODED_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"=\?([^?\s]+)\?([bBqQ])\?([^?\s]*)\?=").expect("valid encoded-word pattern")
});

const DAY_NAMES: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

const MONTH_NAMES: [&str; 24] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

/// North American zone names still seen in old mail, as `±hhmm`.
const ZONES: [(&str, i32); 14] = [
    ("UT", 0),
    ("UTC", 0),
    ("GMT", 0),
    ("Z", 0),
    ("AST", -400),
    ("ADT", -300),
    ("EST", -500),
    ("EDT", -400),
    ("CST", -600),
    ("CDT", -500),
    ("MST", -700),
    ("MDT", -600),
    ("PST", -800),
    ("PDT", -700),
];

/// Raw header bytes as text: UTF-8 when valid, windows-1252 otherwise.
pub fn decode_header_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => decode_lossy(encoding_rs::WINDOWS_1252, bytes),
    }
}

/// Decode the RFC 2047 encoded words in `input`.
///
/// Whitespace between two adjacent encoded words is dropped. A word that
/// does not decode is kept as written.
pub fn decode_encoded_words(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    let mut after_word = false;

    for caps in ENCODED_WORD.captures_iter(input) {
        let Some(whole) = caps.get(0) else { continue };
        let gap = &input[last..whole.start()];
        let decoded = decode_word(&caps[1], &caps[2], &caps[3]);

        if !(after_word && decoded.is_some() && gap.trim().is_empty()) {
            out.push_str(gap);
        }
        match decoded {
            Some(text) => {
                out.push_str(&text);
                after_word = true;
            }
            None => {
                out.push_str(whole.as_str());
                after_word = false;
            }
        }
        last = whole.end();
    }

    out.push_str(&input[last..]);
    out
}

fn decode_word(charset: &str, encoding: &str, text: &str) -> Option<String> {
    let bytes = if encoding.eq_ignore_ascii_case("b") {
        decode_base64(text.as_bytes())?
    } else {
        decode_q(text)
    };

    // RFC 2231 language suffix: `utf-8*en`.
    let charset = charset.split('*').next().unwrap_or(charset);
    Some(match lookup_charset(charset) {
        Some(encoding) => decode_lossy(encoding, &bytes),
        None => {
            debug!(charset, "Unknown encoded-word charset, reading as UTF-8");
            String::from_utf8_lossy(&bytes).into_owned()
        }
    })
}

/// The `Q` encoding: `_` is a space, `=XX` a byte.
fn decode_q(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => out.push(b' '),
            b'=' => {
                let byte = bytes
                    .get(i + 1..i + 3)
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                if let Some(byte) = byte {
                    out.push(byte);
                    i += 3;
                    continue;
                }
                out.push(b'=');
            }
            b => out.push(b),
        }
        i += 1;
    }
    out
}

/// Parse a mail date the forgiving way old clients need.
///
/// Accepts RFC 2822 dates with or without the day name, seconds or zone,
/// `dd-Mon-yy` (RFC 850) dates, ctime-like field orders, two-digit years
/// and the common North American zone names. A missing or unknown zone
/// reads as `+0000`. The written offset is kept, so a separator line shows
/// the sender's wall-clock time.
pub fn parse_date(input: &str) -> Option<DateTime<FixedOffset>> {
    let parsed = parse_loose(input).or_else(|| mail_parser_date(input.trim()));
    if parsed.is_none() {
        debug!(date = input, "Could not parse date");
    }
    parsed
}

fn parse_loose(input: &str) -> Option<DateTime<FixedOffset>> {
    let mut fields: Vec<&str> = input.split_whitespace().collect();

    let first = *fields.first()?;
    if first.ends_with(',') || DAY_NAMES.contains(&first.to_ascii_lowercase().as_str()) {
        fields.remove(0);
    } else if let Some(comma) = first.rfind(',') {
        fields[0] = &first[comma + 1..];
    }

    if fields.len() == 3 {
        let dashed: Vec<&str> = fields[0].split('-').collect();
        if dashed.len() == 3 {
            fields.splice(0..1, dashed);
        }
    }
    if fields.len() == 4 {
        // Zone glued to the time: `10:00:00-0500`.
        let time = fields[3];
        match time.find('+').or_else(|| time.find('-')) {
            Some(at) if at > 0 => {
                fields.splice(3..4, [&time[..at], &time[at..]]);
            }
            _ => fields.push(""),
        }
    }
    if fields.len() < 5 {
        return None;
    }

    let (mut day, mut month, mut year, mut time, mut zone) =
        (fields[0], fields[1], fields[2], fields[3], fields[4]);
    if day.is_empty() || month.is_empty() || year.is_empty() {
        return None;
    }

    let month = match month_number(month) {
        Some(number) => number,
        None => {
            std::mem::swap(&mut day, &mut month);
            month_number(month)?
        }
    };
    let day = day.strip_suffix(',').unwrap_or(day);
    if year.find(':').is_some_and(|at| at > 0) {
        std::mem::swap(&mut year, &mut time);
    }
    year = year.strip_suffix(',').unwrap_or(year);
    if !year.starts_with(|c: char| c.is_ascii_digit()) {
        std::mem::swap(&mut year, &mut zone);
    }
    time = time.strip_suffix(',').unwrap_or(time);

    let (hour, minute, second) = split_time(time)?;
    let mut year: i32 = year.parse().ok()?;
    if year < 100 {
        year += if year > 68 { 1900 } else { 2000 };
    }

    let offset = FixedOffset::east_opt(zone_seconds(zone).unwrap_or(0))?;
    let naive = NaiveDate::from_ymd_opt(year, month, day.parse().ok()?)?
        .and_hms_opt(hour.parse().ok()?, minute.parse().ok()?, second.parse().ok()?)?;
    offset.from_local_datetime(&naive).single()
}

fn month_number(name: &str) -> Option<u32> {
    let name = name.to_ascii_lowercase();
    let index = MONTH_NAMES.iter().position(|m| *m == name)?;
    Some(index as u32 % 12 + 1)
}

/// `hh:mm`, `hh:mm:ss` or the dotted variants.
fn split_time(time: &str) -> Option<(&str, &str, &str)> {
    let mut parts: Vec<&str> = time.split(':').collect();
    if parts.len() == 1 && time.contains('.') {
        parts = time.split('.').collect();
    }
    match parts.as_slice() {
        [hour, minute] => Some((*hour, *minute, "0")),
        [hour, minute, second] => Some((*hour, *minute, *second)),
        _ => None,
    }
}

/// Zone offset in seconds east of UTC. Numeric zones are a sign and at
/// most four digits, and must stay within a day.
fn zone_seconds(zone: &str) -> Option<i32> {
    let upper = zone.to_ascii_uppercase();
    let hhmm = match ZONES.iter().find(|(name, _)| *name == upper) {
        Some(&(_, hhmm)) => hhmm,
        None => {
            let digits = zone.strip_prefix(['+', '-']).unwrap_or(zone);
            if digits.is_empty() || digits.len() > 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            zone.parse().ok()?
        }
    };
    let magnitude = hhmm.abs();
    let seconds = hhmm.signum() * ((magnitude / 100) * 3600 + (magnitude % 100) * 60);
    (seconds.abs() < 86_400).then_some(seconds)
}

/// Last resort: let `mail-parser` have a go.
fn mail_parser_date(input: &str) -> Option<DateTime<FixedOffset>> {
    use mail_parser::MessageParser;

    let wrapped = format!("Date: {input}\n\n");
    let parsed = MessageParser::default().parse(wrapped.as_bytes())?;
    DateTime::parse_from_rfc3339(&parsed.date()?.to_rfc3339()).ok()
}
