//! Markdown text helpers shared by every target.

/// Escapes `_`, `&`, `<` and `>` outside backtick code spans.
pub fn escape_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while !rest.is_empty() {
        let span = rest.find('`').and_then(|open| {
            rest[open + 1..]
                .find('`')
                .map(|close| (open, open + 1 + close + 1))
        });
        let (plain, literal, tail) = match span {
            Some((open, end)) => (&rest[..open], &rest[open..end], &rest[end..]),
            None => (rest, "", ""),
        };
        out.push_str(&html_escape::encode_text(&plain.replace('_', "\\_")));
        out.push_str(literal);
        rest = tail;
    }
    out
}

/// Anchor a markdown renderer generates for a header.
pub fn header_link(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | ' ' | '-'))
        .map(|c| if c == ' ' { '-' } else { c })
        .collect()
}

pub fn indent_lines(lines: &[String]) -> Vec<String> {
    lines.iter().map(|l| format!("    {l}")).collect()
}
