//! Conditional expressions.
//!
//! `(cond ? a : b)` becomes `IFTE(cond, a, b)`. The `?` must stand between
//! spaces. Inner groups are rewritten before the groups around them and
//! either branch may itself be a conditional.

use super::Desugarer;
use crate::aliases::matching_paren;
use crate::context::CompilerContext;
use crate::pattern::is_word_char;

#[derive(Debug, Default)]
pub struct Ifte;

impl Ifte {
    pub fn new() -> Self {
        Self
    }
}

/// Rewrite every parenthesized conditional in `text`
pub fn rewrite(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'(' {
            i += 1;
            continue;
        }
        let Some(close) = matching_paren(text, i) else {
            break;
        };

        let inner = rewrite(&text[i + 1..close]);
        out.push_str(&text[cursor..i]);
        match conditional(&inner) {
            // `f(c ? a : b)` keeps the call's own parentheses
            Some(ifte) if text[..i].ends_with(is_word_char) => {
                out.push('(');
                out.push_str(&ifte);
                out.push(')');
            }
            Some(ifte) => out.push_str(&ifte),
            None => {
                out.push('(');
                out.push_str(&inner);
                out.push(')');
            }
        }
        i = close + 1;
        cursor = i;
    }

    out.push_str(&text[cursor..]);
    out
}

/// `cond ? a : b` at the top level of `text` as an `IFTE` call
fn conditional(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut question = None;
    let mut pending = 0usize;
    let mut colon = None;

    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'?' if depth == 0 => {
                let spaced = i > 0
                    && bytes[i - 1].is_ascii_whitespace()
                    && bytes.get(i + 1).is_some_and(u8::is_ascii_whitespace);
                if spaced {
                    question.get_or_insert(i);
                    pending += 1;
                }
            }
            b':' if depth == 0 && question.is_some() => {
                let assignment = matches!(bytes.get(i + 1), Some(b'=') | Some(b':'));
                let scoped = i > 0 && bytes[i - 1] == b':';
                if !assignment && !scoped {
                    pending -= 1;
                    if pending == 0 {
                        colon = Some(i);
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    let (question, colon) = (question?, colon?);
    let condition = text[..question].trim();
    let when_true = text[question + 1..colon].trim();
    let when_false = text[colon + 1..].trim();
    if condition.is_empty() || when_true.is_empty() || when_false.is_empty() {
        return None;
    }

    let when_true = conditional(when_true).unwrap_or_else(|| when_true.to_string());
    let when_false = conditional(when_false).unwrap_or_else(|| when_false.to_string());
    Some(format!("IFTE({condition}, {when_true}, {when_false})"))
}

impl Desugarer for Ifte {
    fn name(&self) -> &'static str {
        "ifte"
    }

    fn description(&self) -> &'static str {
        "lowers (cond ? a : b) to IFTE(cond, a, b) inside blocks"
    }

    fn apply(&mut self, line: &mut String, ctx: &mut CompilerContext) -> bool {
        if ctx.depth() == 0 || !line.contains(" ? ") {
            return false;
        }
        let rewritten = rewrite(line);
        if rewritten == *line {
            return false;
        }
        *line = rewritten;
        true
    }
}
