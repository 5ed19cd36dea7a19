//! Code stack tokens.
//!
//! Pattern rules can stash text for later: `` __PUSH__`text` `` pushes
//! `text` and disappears, `__POP__` is replaced by the most recently pushed
//! text and removes it, `__TOP__` is replaced by it without removing it.
//! Tokens are processed left to right.

use tracing::debug;

use super::Desugarer;
use crate::context::CompilerContext;

#[derive(Debug, Default)]
pub struct CodeStack {
    stack: Vec<String>,
}

impl CodeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

impl Desugarer for CodeStack {
    fn name(&self) -> &'static str {
        "code-stack"
    }

    fn description(&self) -> &'static str {
        "pushes, pops and peeks text saved by pattern rules"
    }

    fn apply(&mut self, line: &mut String, ctx: &mut CompilerContext) -> bool {
        let token = static_regex!(r"__PUSH__`([^`]*)`|__POP__|__TOP__");
        if !token.is_match(line) {
            return false;
        }

        let mut out = String::with_capacity(line.len());
        let mut last = 0;
        for caps in token.captures_iter(line) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&line[last..whole.start()]);
            last = whole.end();

            if let Some(text) = caps.get(1) {
                debug!("code stack push '{}'", text.as_str());
                self.stack.push(text.as_str().to_string());
                continue;
            }

            let value = if whole.as_str() == "__POP__" {
                self.stack.pop()
            } else {
                self.stack.last().cloned()
            };
            match value {
                Some(value) => out.push_str(&value),
                None => ctx.warning(format!("{} on an empty code stack", whole.as_str())),
            }
        }
        out.push_str(&line[last..]);

        *line = out;
        true
    }
}
