//! Line-level rewrites applied to every line of a recovered mailbox before
//! it is parsed.
//!
//! Each rule is a byte regex and a replacement template. Rules run in table
//! order and every rule that changes a line is recorded as a [`LineRepair`].

use std::sync::LazyLock;

use regex::bytes::Regex;

/// A single rewrite rule.
pub struct LineRule {
    pub name: &'static str,
    pattern: Regex,
    replacement: &'static [u8],
}

/// A line changed by a [`LineRule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRepair {
    pub rule: &'static str,
    pub original: Vec<u8>,
    pub repaired: Vec<u8>,
}

static LINE_RULES: LazyLock<Vec<LineRule>> = LazyLock::new(|| {
    vec![
        // `<[id]>`, `<@id>` and `<<id>` confuse header parsers.
        LineRule {
            name: "message-id-brackets",
            pattern: Regex::new(r"(?i-u)^(message-id:\s*)<[\[@<](.*?)\]?>")
                .expect("valid message-id rule"),
            replacement: b"${1}<${2}>",
        },
        // Keep the parameters, drop the multipart type whose boundaries are gone.
        LineRule {
            name: "strip-multipart-type",
            pattern: Regex::new(r"(?i-u)^(content-type:\s*)multipart/\w+;(.*)")
                .expect("valid content-type rule"),
            replacement: b"${1}${2}",
        },
    ]
});

static DATE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i-u)^date:(.*)").expect("valid date rule"));

/// The rule table, in application order.
pub fn line_rules() -> &'static [LineRule] {
    &LINE_RULES
}

/// Run every rule over `line`, recording the ones that change it.
pub fn apply_line_rules(mut line: Vec<u8>, repairs: &mut Vec<LineRepair>) -> Vec<u8> {
    for rule in line_rules() {
        let rewritten = rule.pattern.replace(&line, rule.replacement);
        if rewritten.as_ref() != line.as_slice() {
            let rewritten = rewritten.into_owned();
            repairs.push(LineRepair {
                rule: rule.name,
                original: line,
                repaired: rewritten.clone(),
            });
            line = rewritten;
        }
    }
    line
}

/// The trimmed remainder of a `Date:` line, if `line` is one.
pub fn date_remainder(line: &[u8]) -> Option<String> {
    let captures = DATE_LINE.captures(line)?;
    let value = String::from_utf8_lossy(&captures[1]).trim().to_string();
    Some(value)
}
