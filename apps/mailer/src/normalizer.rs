//! HTML body normalizer — cleans rich-text editor output before it is sent.
//!
//! Editors wrap every line in `<p>…</p>`. Mail clients render those with
//! inconsistent margins, so paragraphs are flattened to `<br>` pairs instead.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static PARAGRAPH_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<p(?:\s[^>]*)?>").expect("paragraph open pattern"));

static PARAGRAPH_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</p\s*>").expect("paragraph close pattern"));

/// Three or more line breaks in a row, whitespace allowed between them.
static BREAK_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>(?:\s*<br\s*/?>){2,}").expect("break run pattern")
});

const PARAGRAPH_BREAK: &str = "<br><br>";

/// Normalizes an HTML email body.
///
/// 1. paragraph opening tags are dropped
/// 2. paragraph closing tags become `<br><br>`
/// 3. runs of three or more line breaks collapse to `<br><br>`
///
/// Pure and idempotent.
pub fn normalize(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let without_open = strip_paragraph_opens(html);
    let with_breaks = PARAGRAPH_CLOSE.replace_all(&without_open, PARAGRAPH_BREAK);
    BREAK_RUN
        .replace_all(&with_breaks, PARAGRAPH_BREAK)
        .into_owned()
}

/// Removing `<p>` from `<p<p>>` leaves a fresh `<p>`, so strip until nothing matches.
fn strip_paragraph_opens(html: &str) -> String {
    let mut current = html.to_string();
    loop {
        match PARAGRAPH_OPEN.replace_all(&current, "") {
            Cow::Borrowed(_) => return current,
            Cow::Owned(next) => current = next,
        }
    }
}
