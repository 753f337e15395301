//! Text normalization for stored page content.

/// Join text fragments one per line, trimming each and dropping blanks.
pub fn join_text_nodes<'a>(nodes: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for node in nodes.into_iter().map(str::trim).filter(|n| !n.is_empty()) {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(node);
    }
    out
}

/// Keep at most `max_chars` characters, never splitting a code point.
pub fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(idx);
    }
    text
}
