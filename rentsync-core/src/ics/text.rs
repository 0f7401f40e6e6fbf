//! TEXT value unescaping for inbound feeds.

/// Undo TEXT escaping (`\\`, `\;`, `\,`, `\n`). Unknown escapes are kept verbatim.
pub fn unescape_text(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            plain.push(ch);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => plain.push('\n'),
            Some(c @ ('\\' | ';' | ',')) => plain.push(c),
            Some(other) => {
                plain.push('\\');
                plain.push(other);
            }
            None => plain.push('\\'),
        }
    }
    plain
}
