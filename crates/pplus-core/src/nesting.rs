//! Block keyword scanner.
//!
//! One definition of which PPL words open and close a block, shared by the
//! translator's depth tracking, the minifier's block detection and the
//! reformatter's indentation.

use crate::pattern::is_word_char;

/// Words that open a block
pub const OPENERS: &[&str] = &["BEGIN", "IF", "FOR", "CASE", "REPEAT", "WHILE", "IFERR", "switch"];

/// Words that close a block
pub const CLOSERS: &[&str] = &["END", "UNTIL"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockToken {
    Open,
    Close,
    Else,
}

/// A block keyword found in a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenMatch {
    pub token: BlockToken,
    pub start: usize,
    pub end: usize,
}

/// Block keywords of `text` in order. Words behind a `#` (directive
/// markers like `#END`) are not keywords.
pub fn scan(text: &str) -> Vec<TokenMatch> {
    let mut matches = Vec::new();
    let mut word_start: Option<usize> = None;
    let mut prev: Option<char> = None;

    let flush = |start: usize, end: usize, before: Option<char>, matches: &mut Vec<TokenMatch>| {
        if before == Some('#') {
            return;
        }
        let word = &text[start..end];
        let token = if OPENERS.contains(&word) {
            BlockToken::Open
        } else if CLOSERS.contains(&word) {
            BlockToken::Close
        } else if word == "ELSE" {
            BlockToken::Else
        } else {
            return;
        };
        matches.push(TokenMatch { token, start, end });
    };

    let mut before_word = None;
    for (i, c) in text.char_indices() {
        if is_word_char(c) {
            if word_start.is_none() {
                word_start = Some(i);
                before_word = prev;
            }
        } else if let Some(start) = word_start.take() {
            flush(start, i, before_word, &mut matches);
        }
        prev = Some(c);
    }
    if let Some(start) = word_start {
        flush(start, text.len(), before_word, &mut matches);
    }

    matches
}

/// Block structure of one line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineNesting {
    pub opens: usize,
    pub closes: usize,
    /// The keyword the line starts with, if any
    pub leading: Option<BlockToken>,
}

impl LineNesting {
    /// Indentation level of the line when the depth before it is `depth`
    pub fn indent_level(&self, depth: usize) -> usize {
        match self.leading {
            Some(BlockToken::Close) | Some(BlockToken::Else) => depth.saturating_sub(1),
            _ => depth,
        }
    }

    /// Depth after the line when the depth before it is `depth`
    pub fn depth_after(&self, depth: usize) -> usize {
        (depth + self.opens).saturating_sub(self.closes)
    }
}

pub fn analyze_line(line: &str) -> LineNesting {
    let tokens = scan(line);
    let first_word = line.len() - line.trim_start().len();
    LineNesting {
        opens: tokens.iter().filter(|t| t.token == BlockToken::Open).count(),
        closes: tokens.iter().filter(|t| t.token == BlockToken::Close).count(),
        leading: tokens
            .first()
            .filter(|t| t.start == first_word)
            .map(|t| t.token),
    }
}

/// Byte ranges of the outermost `BEGIN ... END` blocks of `text`, from the
/// start of `BEGIN` to the end of the matching `END`
pub fn top_level_blocks(text: &str) -> Vec<(usize, usize)> {
    let mut blocks = Vec::new();
    let mut depth = 0usize;
    let mut start = None;

    for token in scan(text) {
        match token.token {
            BlockToken::Open => {
                if depth == 0 && &text[token.start..token.end] == "BEGIN" {
                    start = Some(token.start);
                }
                if depth > 0 || start.is_some() {
                    depth += 1;
                }
            }
            BlockToken::Close if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(begin) = start.take() {
                        blocks.push((begin, token.end));
                    }
                }
            }
            _ => {}
        }
    }

    blocks
}
