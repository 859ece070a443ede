//! Text helpers for diagnostics.

/// Truncates `text` to at most `max_chars` characters, appending an
/// ellipsis when anything was cut.
#[must_use]
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
