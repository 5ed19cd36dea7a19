/*!
# Post-passes

Passes over already generated PPL:

- [`minify`] compresses a program: short local names, no layout
- [`reformat`] lays a program out again, one statement per line

Both leave `#PYTHON`/`#PPL` ... `#END` blocks and `#pragma` lines exactly
as they are, and never look inside string literals.
*/

pub mod minifier;
pub mod reformat;

use std::collections::HashMap;

pub use minifier::minify;
pub use reformat::reformat;

use crate::pattern::is_word_char;

/// A piece of program text as seen by a post-pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    /// A line that must be kept as is
    Verbatim(String),
    /// Consecutive lines of PPL
    Code(String),
}

/// Split `text` into verbatim lines and runs of PPL
pub(crate) fn segments(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut code = String::new();
    let mut embedded = false;

    for line in text.lines() {
        let trimmed = line.trim_start();
        let opens_block = trimmed.starts_with("#PYTHON") || trimmed.starts_with("#PPL");
        let verbatim = embedded || opens_block || trimmed.starts_with("#pragma");
        if embedded && trimmed.starts_with("#END") {
            embedded = false;
        } else if opens_block {
            embedded = true;
        }

        if verbatim {
            if !code.is_empty() {
                segments.push(Segment::Code(std::mem::take(&mut code)));
            }
            segments.push(Segment::Verbatim(line.to_string()));
        } else {
            code.push_str(line);
            code.push('\n');
        }
    }
    if !code.is_empty() {
        segments.push(Segment::Code(code));
    }

    segments
}

/// Replace whole words found in `renames`
pub(crate) fn replace_words(text: &str, renames: &HashMap<String, String>) -> String {
    if renames.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut word_start = None;
    for (i, c) in text.char_indices() {
        if is_word_char(c) {
            word_start.get_or_insert(i);
            continue;
        }
        if let Some(start) = word_start.take() {
            push_word(&mut out, &text[start..i], renames);
        }
        out.push(c);
    }
    if let Some(start) = word_start {
        push_word(&mut out, &text[start..], renames);
    }

    out
}

fn push_word(out: &mut String, word: &str, renames: &HashMap<String, String>) {
    match renames.get(word) {
        Some(replacement) => out.push_str(replacement),
        None => out.push_str(word),
    }
}

/// Every whole word of `text`
pub(crate) fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !is_word_char(c)).filter(|w| !w.is_empty())
}
