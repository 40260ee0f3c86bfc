pub mod emoji;
pub mod matchers;

pub use emoji::Emoji;

const MARKDOWN_REPLACEMENTS: &[char; 7] = &['\\', '*', '_', '~', '|', '`', '>'];

/// Escapes markdown control characters so user supplied names render literally in chat.
pub fn escape_markdown(msg: &str) -> String {
    let mut out = String::with_capacity(msg.len());
    for c in msg.chars() {
        if MARKDOWN_REPLACEMENTS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
