//! String literal and comment protection.
//!
//! While a line is rewritten, the contents of its string literals and its
//! trailing `//` comment must not be touched. [`ProtectedStrings`] swaps each
//! literal for an inert quoted placeholder and puts the originals back
//! afterwards; [`split_comment`] separates the code from the comment.

/// Marks a placeholder. Index digits are spelled with private-use characters
/// so no later rewrite can mistake them for identifiers or numbers.
const MARKER: char = '\u{E000}';
const DIGIT_BASE: u32 = 0xE010;

/// Store of string literals taken out of a piece of text
#[derive(Debug, Default, Clone)]
pub struct ProtectedStrings {
    literals: Vec<String>,
}

impl ProtectedStrings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every quoted literal in `text` with a placeholder.
    ///
    /// Placeholders already present are left alone, so text can be protected
    /// again after new literals were introduced into it.
    pub fn protect(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.char_indices();

        while let Some((start, c)) = chars.next() {
            if c != '"' {
                out.push(c);
                continue;
            }

            let mut end = None;
            let mut escaped = false;
            for (i, inner) in chars.by_ref() {
                if escaped {
                    escaped = false;
                } else if inner == '\\' {
                    escaped = true;
                } else if inner == '"' {
                    end = Some(i);
                    break;
                }
            }

            match end {
                Some(end) => {
                    let literal = &text[start..=end];
                    if is_placeholder(literal) {
                        out.push_str(literal);
                    } else {
                        out.push_str(&placeholder(self.literals.len()));
                        self.literals.push(literal.to_string());
                    }
                }
                // Unterminated: keep the rest as written.
                None => out.push_str(&text[start..]),
            }
        }

        out
    }

    /// Put the protected literals back
    pub fn restore(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(pos) = rest.find('"') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            match decode_placeholder(tail) {
                Some((index, len)) => {
                    // placeholders of an outer store stay for that store to restore
                    match self.literals.get(index) {
                        Some(literal) => out.push_str(literal),
                        None => out.push_str(&tail[..len]),
                    }
                    rest = &tail[len..];
                }
                None => {
                    out.push('"');
                    rest = &tail[1..];
                }
            }
        }

        out.push_str(rest);
        out
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn clear(&mut self) {
        self.literals.clear();
    }
}

fn placeholder(index: usize) -> String {
    let mut digits = Vec::new();
    let mut n = index;
    loop {
        digits.push(char::from_u32(DIGIT_BASE + (n % 16) as u32).unwrap_or(MARKER));
        n /= 16;
        if n == 0 {
            break;
        }
    }

    let mut out = String::from('"');
    out.push(MARKER);
    out.extend(digits.iter().rev());
    out.push('"');
    out
}

fn is_placeholder(literal: &str) -> bool {
    decode_placeholder(literal).map(|(_, len)| len) == Some(literal.len())
}

/// Decode a placeholder at the start of `text`, returning its index and byte length
fn decode_placeholder(text: &str) -> Option<(usize, usize)> {
    let mut chars = text.char_indices();
    if chars.next()?.1 != '"' || chars.next()?.1 != MARKER {
        return None;
    }

    let mut index = 0usize;
    let mut seen = false;
    for (i, c) in chars {
        let code = c as u32;
        if c == '"' && seen {
            return Some((index, i + 1));
        }
        if !(DIGIT_BASE..DIGIT_BASE + 16).contains(&code) {
            return None;
        }
        index = index * 16 + (code - DIGIT_BASE) as usize;
        seen = true;
    }
    None
}

/// Split a line at its `//` comment, outside of string literals.
///
/// Returns the code part (right-trimmed) and the comment including `//`.
pub fn split_comment(line: &str) -> (&str, Option<&str>) {
    let mut in_string = false;
    let mut prev = '\0';
    for (i, c) in line.char_indices() {
        match c {
            '"' if prev != '\\' => in_string = !in_string,
            '/' if !in_string && prev == '/' => {
                let start = i - 1;
                return (line[..start].trim_end(), Some(&line[start..]));
            }
            _ => {}
        }
        prev = c;
    }
    (line, None)
}

/// Collapse runs of whitespace into a single space
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending = false;
    for c in text.chars() {
        if c.is_whitespace() && c != '\n' {
            pending = true;
            continue;
        }
        if pending && !out.is_empty() && !out.ends_with('\n') {
            out.push(' ');
        }
        pending = false;
        out.push(c);
    }
    out
}

/// Expand tab characters to spaces
pub fn expand_tabs(text: &str, width: usize) -> String {
    text.replace('\t', &" ".repeat(width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_protect_and_restore() {
        let mut strings = ProtectedStrings::new();
        let protected = strings.protect(r#"PRINT("if x = 1 then"); MSGBOX("a\"b");"#);
        assert!(!protected.contains("then"));
        assert!(!protected.contains("a\\\"b"));
        assert_eq!(strings.len(), 2);

        let rewritten = protected.replace("PRINT", "PRINT2");
        assert_eq!(
            strings.restore(&rewritten),
            r#"PRINT2("if x = 1 then"); MSGBOX("a\"b");"#
        );
    }

    #[test]
    fn test_reprotect_keeps_existing_placeholders() {
        let mut strings = ProtectedStrings::new();
        let first = strings.protect(r#"a := "one";"#);
        let second = strings.protect(&format!(r#"{first} b := "two";"#));
        assert_eq!(strings.len(), 2);
        assert_eq!(strings.restore(&second), r#"a := "one"; b := "two";"#);
    }

    #[test]
    fn test_new_literals_are_not_placeholders() {
        let mut strings = ProtectedStrings::new();
        let protected = strings.protect(r#"x := "kept";"#);
        let text = format!(r#"{protected} y := "";"#);
        assert_eq!(strings.restore(&text), r#"x := "kept"; y := "";"#);
    }

    #[test]
    fn test_inner_store_keeps_outer_placeholders() {
        let mut outer = ProtectedStrings::new();
        let protected = outer.protect(r#"PRINT("a // b"); s := "x;y";"#);

        let mut inner = ProtectedStrings::new();
        let reprotected = inner.protect(&protected);
        assert!(inner.is_empty());
        let back = inner.restore(&reprotected);
        assert_eq!(back, protected);
        assert_eq!(outer.restore(&back), r#"PRINT("a // b"); s := "x;y";"#);
    }

    #[test]
    fn test_many_placeholders() {
        let mut strings = ProtectedStrings::new();
        let source: Vec<String> = (0..40).map(|i| format!("\"s{i}\"")).collect();
        let joined = source.join(",");
        let protected = strings.protect(&joined);
        assert_eq!(strings.restore(&protected), joined);
    }

    #[test]
    fn test_split_comment() {
        assert_eq!(split_comment("x := 1; // set x"), ("x := 1;", Some("// set x")));
        assert_eq!(split_comment(r#"PRINT("http://a");"#), (r#"PRINT("http://a");"#, None));
        assert_eq!(split_comment("// only"), ("", Some("// only")));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a   :=  b ;  "), "a := b ;");
        assert_eq!(collapse_whitespace("   lead"), "lead");
    }
}
