/*!
# Desugarers

Line rewrites that lower a P+ construct to plain PPL. Each desugarer looks
at one line at a time, may keep state across lines (an open `struct`
declaration, the pending step of a C-style `for`, ...) and may register
aliases in the compiler context.

The translator runs them in a fixed order; see `translator` for the
pipeline. Statistics are collected per desugarer.
*/

pub mod alias;
pub mod auto;
pub mod code_stack;
pub mod def;
pub mod dictionary;
pub mod enums;
pub mod for_next;
pub mod ifte;
pub mod operators;
pub mod structs;
pub mod sugar;
pub mod switch;

use std::collections::BTreeMap;

use crate::context::CompilerContext;

pub use alias::{AliasStatement, Namespaces};
pub use auto::AutoNaming;
pub use code_stack::CodeStack;
pub use def::Def;
pub use dictionary::Dictionary;
pub use enums::Enums;
pub use for_next::ForNext;
pub use ifte::Ifte;
pub use operators::Operators;
pub use structs::Structs;
pub use sugar::Sugar;
pub use switch::Switch;

/// A rewrite of one P+ construct
pub trait Desugarer {
    /// Short name used in statistics and logs
    fn name(&self) -> &'static str;

    /// What the desugarer rewrites
    fn description(&self) -> &'static str;

    /// Rewrite `line` in place.
    ///
    /// Returns true when the line contained the construct. A line left empty
    /// by a desugarer was a declaration and produces no output.
    fn apply(&mut self, line: &mut String, ctx: &mut CompilerContext) -> bool;
}

/// Per-desugarer counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleStats {
    pub rule_name: &'static str,
    pub applications: u64,
    pub lines_consumed: u64,
}

impl RuleStats {
    pub fn new(rule_name: &'static str) -> Self {
        Self {
            rule_name,
            ..Default::default()
        }
    }
}

/// Statistics over every desugarer run by a translation
#[derive(Debug, Clone, Default)]
pub struct DesugarStats {
    rules: BTreeMap<&'static str, RuleStats>,
}

impl DesugarStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `rule` to `line`, counting the application when it fires
    pub fn run<D: Desugarer + ?Sized>(&mut self, rule: &mut D, line: &mut String, ctx: &mut CompilerContext) -> bool {
        let fired = rule.apply(line, ctx);
        if fired {
            let stats = self
                .rules
                .entry(rule.name())
                .or_insert_with(|| RuleStats::new(rule.name()));
            stats.applications += 1;
            if line.trim().is_empty() {
                stats.lines_consumed += 1;
            }
        }
        fired
    }

    pub fn get(&self, name: &str) -> Option<&RuleStats> {
        self.rules.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuleStats> {
        self.rules.values()
    }

    pub fn total_applications(&self) -> u64 {
        self.rules.values().map(|s| s.applications).sum()
    }
}

/// Split `text` at commas that are not nested in brackets, braces or parens
pub(crate) fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            c if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}
