//! Content inspections shared by the field controller and paste handling.

use regex::Regex;
use std::sync::LazyLock;

// `.` in a JS regex stops at every line terminator, not only `\n`.
static CLOZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{c\d+::[^\n\r\x{2028}\x{2029}]*?\}\}").expect("cloze pattern is valid")
});

/// Whitespace as `String.prototype.trim` sees it: BOM included, NEL not.
fn is_js_whitespace(c: char) -> bool {
    c == '\u{FEFF}' || (c.is_whitespace() && c != '\u{85}')
}

/// Rendered content counts as empty when only whitespace remains.
pub fn is_blank(html: &str) -> bool {
    html.chars().all(is_js_whitespace)
}

pub fn contains_cloze(html: &str) -> bool {
    CLOZE_RE.is_match(html)
}

/// Whether the host has to re-render the card after a submit.
///
/// `in_field_container` is true when the editable element sits directly inside
/// an element classed `field`; those fields carry language syntax, so any `[`
/// may need rendering.
pub fn needs_reload(html: &str, in_field_container: bool) -> bool {
    (in_field_container && html.contains('['))
        || html.contains("[sound:")
        || contains_cloze(html)
}

/// Strip every tag except image tags from pasted HTML.
///
/// A tag is `<`, then a non-empty body without `>`, then `>`. It survives only
/// if `img` occurs somewhere in its body. The check is case-sensitive.
pub fn strip_non_image_tags(html: &str) -> String {
    let bytes = html.as_bytes();
    let mut out = String::with_capacity(html.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }

        let body_start = i + 1;
        let Some(rel_end) = html[body_start..].find('>') else {
            break;
        };
        let body_end = body_start + rel_end;
        let body = &html[body_start..body_end];

        if body.is_empty() || body.contains("img") {
            // No match from this `<`; the next attempt starts one byte later.
            i += 1;
            continue;
        }

        out.push_str(&html[copied..i]);
        copied = body_end + 1;
        i = copied;
    }

    out.push_str(&html[copied..]);
    out
}
