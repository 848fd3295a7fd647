//! Whitespace and entity clean-up for text lifted out of HTML.

const NON_BREAKING_SPACE: char = '\u{00A0}';
const SOFT_HYPHEN: char = '\u{00AD}';
const ZERO_WIDTH_SPACE: char = '\u{200B}';

/// Collapse runs of whitespace (including non-breaking spaces) to single
/// spaces, drop soft hyphens and zero-width spaces, and trim.
pub fn clean_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for c in raw.chars() {
        match c {
            SOFT_HYPHEN | ZERO_WIDTH_SPACE => {}
            c if c.is_whitespace() || c == NON_BREAKING_SPACE => pending_space = true,
            c => {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                out.push(c);
            }
        }
    }
    out
}
