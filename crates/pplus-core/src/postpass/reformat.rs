//! PPL reformatter.
//!
//! Rebuilds the layout of a program: one statement per line, block bodies
//! indented, keywords upper case, comparison operators as calculator glyphs
//! and a blank line after every top level block.

use super::{segments, Segment};
use crate::desugar::split_top_level;
use crate::desugar::sugar::capitalize_keywords;
use crate::nesting::analyze_line;
use crate::strings::{collapse_whitespace, split_comment, ProtectedStrings};

pub fn reformat(text: &str, indent_width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut depth = 0usize;

    for segment in segments(text) {
        match segment {
            Segment::Verbatim(line) => lines.push(line),
            Segment::Code(code) => {
                for line in code.lines() {
                    for piece in reformat_line(line) {
                        let nesting = analyze_line(&piece);
                        let indent = " ".repeat(nesting.indent_level(depth) * indent_width);
                        let after = nesting.depth_after(depth);
                        lines.push(format!("{indent}{piece}"));
                        if depth > 0 && after == 0 {
                            lines.push(String::new());
                        }
                        depth = after;
                    }
                }
            }
        }
    }

    let mut out = lines.join("\n").trim_end().to_string();
    out.push('\n');
    out
}

/// Statements of one source line, unindented
fn reformat_line(line: &str) -> Vec<String> {
    let (code, comment) = split_comment(line);
    let mut strings = ProtectedStrings::new();
    let mut text = capitalize_keywords(&strings.protect(code));
    text = static_regex!(r"\bend\b").replace_all(&text, "END").into_owned();

    for (from, to) in [(">=", "≥"), ("<=", "≤"), ("<>", "≠"), ("!=", "≠")] {
        text = text.replace(from, to);
    }
    text = static_regex!(r"\b(THEN|DO|REPEAT|ELSE|DEFAULT|CASE|BEGIN|IFERR)\b")
        .replace_all(&text, "$1\n")
        .into_owned();
    text = static_regex!(r"\b(ELSE|END|UNTIL|DEFAULT|BEGIN)\b")
        .replace_all(&text, "\n$1")
        .into_owned();

    let mut pieces = Vec::new();
    for chunk in text.split('\n') {
        let statements = split_top_level(chunk, ';');
        let last = statements.len().saturating_sub(1);
        for (i, statement) in statements.into_iter().enumerate() {
            let mut piece = collapse_whitespace(statement);
            piece = static_regex!(r"\s*,\s*").replace_all(&piece, ", ").into_owned();
            piece = static_regex!(r"\s*:=\s*").replace_all(&piece, " := ").into_owned();
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            let terminator = if i < last { ";" } else { "" };
            pieces.push(format!("{}{terminator}", strings.restore(piece)));
        }
    }

    if let Some(comment) = comment {
        match pieces.last_mut() {
            Some(last) => {
                last.push(' ');
                last.push_str(comment);
            }
            None => pieces.push(comment.to_string()),
        }
    }
    pieces
}
