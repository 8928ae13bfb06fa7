//! Eudora's `<x-html>` and `<x-flowed>` wrappers.

use std::sync::LazyLock;

use regex::Regex;

static X_HTML: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<x-html>(.*?)</x-html>").expect("valid x-html pattern"));
static X_FLOWED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<x-flowed>(.*?)</x-flowed>").expect("valid x-flowed pattern")
});

/// Inner text of the first `<x-html>` and `<x-flowed>` blocks of a body.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Markup {
    pub html: Option<String>,
    pub flowed: Option<String>,
}

impl Markup {
    pub fn extract(body: &str) -> Self {
        let first = |pattern: &Regex| {
            pattern
                .captures(body)
                .map(|captures| captures[1].to_string())
        };
        Self {
            html: first(&X_HTML),
            flowed: first(&X_FLOWED),
        }
    }
}
