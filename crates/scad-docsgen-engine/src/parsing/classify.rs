use std::sync::LazyLock;

use regex::Regex;

/// `// Title[(meta)]: [subtitle]`, where a title is one or two capitalized words.
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^// ([A-Z][A-Za-z0-9_&-]*(?: ?[A-Z][A-Za-z0-9_&-]*)?)(\([^)]*\))?:( .*)?$")
        .expect("Invalid block header regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub title: String,
    pub meta: String,
    pub subtitle: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    Header(BlockHeader),
    /// A `//` comment line that is not a header.
    Comment,
    /// Code, blank lines, anything else.
    Other,
}

/// Body lines of one block, already de-dented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    pub lines: Vec<String>,
    /// Index of the first line after the body.
    pub end: usize,
}

/// A body line sat left of the first body line's indentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShallowLine {
    pub line: usize,
}

pub struct CommentLineClassifier;

impl CommentLineClassifier {
    pub fn classify(line: &str) -> LineClass {
        if let Some(header) = Self::header(line) {
            LineClass::Header(header)
        } else if line.starts_with("//") {
            LineClass::Comment
        } else {
            LineClass::Other
        }
    }

    pub fn header(line: &str) -> Option<BlockHeader> {
        let caps = HEADER_RE.captures(line)?;
        let meta = caps
            .get(2)
            .map(|m| {
                let m = m.as_str();
                m[1..m.len() - 1].to_string()
            })
            .unwrap_or_default();
        let subtitle = caps
            .get(3)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        Some(BlockHeader {
            title: caps[1].to_string(),
            meta,
            subtitle,
        })
    }

    pub fn is_header(line: &str) -> bool {
        HEADER_RE.is_match(line)
    }

    /// Collects the body that starts at `start`.
    ///
    /// Body lines are `//` plus at least the indentation of the first body
    /// line (two spaces minimum), which is then stripped from every line.
    /// A `//  ` line indented less than that is an error.
    pub fn read_body<S: AsRef<str>>(lines: &[S], start: usize) -> Result<Body, ShallowLine> {
        let mut indent = 2;
        let mut first = true;
        let mut body = Vec::new();
        let mut pos = start;

        while let Some(line) = lines.get(pos).map(AsRef::as_ref) {
            let Some(rest) = line.strip_prefix("//") else {
                break;
            };
            if !starts_with_spaces(rest, indent) {
                if rest.starts_with("  ") {
                    return Err(ShallowLine { line: pos });
                }
                break;
            }
            if first {
                first = false;
                indent = rest.len() - rest.trim_start().len();
            }
            let text = rest.get(indent..).unwrap_or("");
            body.push(text.trim_end().to_string());
            pos += 1;
        }

        Ok(Body {
            lines: body,
            end: pos,
        })
    }
}

fn starts_with_spaces(text: &str, count: usize) -> bool {
    text.len() >= count && text.bytes().take(count).all(|b| b == b' ')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("// Module: cube()", "Module", "", "cube()")]
    #[case("// Function&Module: foo(a, b)", "Function&Module", "", "foo(a, b)")]
    #[case("// See Also: a(), b()", "See Also", "", "a(), b()")]
    #[case("// Example(3D,Big): Fancy", "Example", "3D,Big", "Fancy")]
    #[case("// Description:", "Description", "", "")]
    #[case("// Figure(Spin;VPD=300):  Twirl  ", "Figure", "Spin;VPD=300", "Twirl")]
    fn recognizes_headers(
        #[case] line: &str,
        #[case] title: &str,
        #[case] meta: &str,
        #[case] subtitle: &str,
    ) {
        let header = CommentLineClassifier::header(line).unwrap();
        assert_eq!(
            header,
            BlockHeader {
                title: title.to_string(),
                meta: meta.to_string(),
                subtitle: subtitle.to_string(),
            }
        );
    }

    #[rstest]
    #[case("//   Module: cube()")]
    #[case("// module: cube()")]
    #[case("// Three Word Title: nope")]
    #[case("// Module:cube()")]
    #[case("module cube() {}")]
    fn rejects_non_headers(#[case] line: &str) {
        assert!(!CommentLineClassifier::is_header(line));
    }

    #[test]
    fn classifies_lines() {
        assert!(matches!(
            CommentLineClassifier::classify("// Section: Shapes"),
            LineClass::Header(_)
        ));
        assert_eq!(CommentLineClassifier::classify("//   text"), LineClass::Comment);
        assert_eq!(CommentLineClassifier::classify(""), LineClass::Other);
    }

    #[test]
    fn body_dedents_by_first_line() {
        let lines = [
            "// Description:",
            "//     First line.",
            "//       Nested.",
            "//     Last line.   ",
            "module foo() {}",
        ];

        let body = CommentLineClassifier::read_body(&lines, 1).unwrap();

        assert_eq!(body.lines, vec!["First line.", "  Nested.", "Last line."]);
        assert_eq!(body.end, 4);
    }

    #[test]
    fn body_stops_at_next_header_or_bare_comment() {
        let lines = ["//   one", "//   two", "// Usage:", "//   three"];

        let body = CommentLineClassifier::read_body(&lines, 0).unwrap();

        assert_eq!(body.lines, vec!["one", "two"]);
        assert_eq!(body.end, 2);
    }

    #[test]
    fn shallow_body_line_is_an_error() {
        let lines = ["//     deep", "//   shallow"];

        let err = CommentLineClassifier::read_body(&lines, 0).unwrap_err();

        assert_eq!(err, ShallowLine { line: 1 });
    }

    #[test]
    fn empty_body() {
        let lines = ["// Status: DEPRECATED", ""];
        let body = CommentLineClassifier::read_body(&lines, 1).unwrap();
        assert!(body.lines.is_empty());
        assert_eq!(body.end, 1);
    }
}
