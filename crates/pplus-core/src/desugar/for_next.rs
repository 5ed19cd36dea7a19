//! C style `for` loops.
//!
//! `for init; cond; step do` becomes `init; WHILE cond DO` and the `next`
//! closing it becomes `step; END;`. A PPL `FOR ... DO` loop closed by `next`
//! is tracked too, so `next` always pairs with the loop it closes.

use tracing::debug;

use super::Desugarer;
use crate::context::CompilerContext;

#[derive(Debug, Clone, PartialEq, Eq)]
struct OpenLoop {
    level: usize,
    step: Option<String>,
}

#[derive(Debug, Default)]
pub struct ForNext {
    loops: Vec<OpenLoop>,
}

impl ForNext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.loops.clear();
    }

    fn close(&mut self, depth: usize) -> String {
        if !self.loops.last().is_some_and(|l| l.level == depth) {
            return "END;".to_string();
        }
        match self.loops.pop().and_then(|l| l.step) {
            Some(step) => format!("{step}; END;"),
            None => "END;".to_string(),
        }
    }
}

impl Desugarer for ForNext {
    fn name(&self) -> &'static str {
        "for-next"
    }

    fn description(&self) -> &'static str {
        "lowers C style for loops to WHILE and pairs next with its loop"
    }

    fn apply(&mut self, line: &mut String, ctx: &mut CompilerContext) -> bool {
        let depth = ctx.depth();
        if depth == 0 {
            return false;
        }
        // loops deeper than the current depth were closed some other way
        self.loops.retain(|l| l.level <= depth);

        let c_style = static_regex!(r"(?i)\bfor\s+([^;]*?)\s*;\s*([^;]+?)\s*;\s*([^;]*?)\s*\bdo\b");
        if let Some(caps) = c_style.captures(line) {
            let Some(range) = caps.get(0).map(|m| m.range()) else {
                return false;
            };
            let init = caps[1].trim().to_string();
            let condition = caps[2].trim().to_string();
            let step = caps[3].trim().to_string();

            let mut rewritten = String::new();
            if !init.is_empty() {
                rewritten.push_str(&init);
                rewritten.push_str("; ");
            }
            rewritten.push_str(&format!("WHILE {condition} DO"));
            debug!("for loop on '{}' at level {}", condition, depth + 1);

            self.loops.push(OpenLoop {
                level: depth + 1,
                step: (!step.is_empty()).then_some(step),
            });
            line.replace_range(range, &rewritten);
            return true;
        }

        if static_regex!(r"(?i)\bfor\s+\w+\s+from\b").is_match(line) {
            self.loops.push(OpenLoop {
                level: depth + 1,
                step: None,
            });
            return false;
        }

        let next = static_regex!(r"(?i)\bnext\b\s*;?");
        let Some(range) = next.find(line).map(|m| m.range()) else {
            return false;
        };
        let closing = self.close(depth);
        line.replace_range(range, &closing);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PplusConfig;
    use pretty_assertions::assert_eq;

    fn run(for_next: &mut ForNext, ctx: &mut CompilerContext, text: &str) -> String {
        let mut line = text.to_string();
        for_next.apply(&mut line, ctx);
        line
    }

    #[test]
    fn test_c_style_loop() {
        let mut ctx = CompilerContext::new(PplusConfig::default());
        let mut for_next = ForNext::new();
        ctx.increase_depth();

        assert_eq!(
            run(&mut for_next, &mut ctx, "for i := 0; i < 10; i += 1 do"),
            "i := 0; WHILE i < 10 DO"
        );
        ctx.increase_depth();
        assert_eq!(run(&mut for_next, &mut ctx, "next;"), "i += 1; END;");
    }

    #[test]
    fn test_loop_without_init_or_step() {
        let mut ctx = CompilerContext::new(PplusConfig::default());
        let mut for_next = ForNext::new();
        ctx.increase_depth();

        assert_eq!(run(&mut for_next, &mut ctx, "for ; x > 0; do"), "WHILE x > 0 DO");
        ctx.increase_depth();
        assert_eq!(run(&mut for_next, &mut ctx, "next"), "END;");
    }

    #[test]
    fn test_nested_loops_pair_correctly() {
        let mut ctx = CompilerContext::new(PplusConfig::default());
        let mut for_next = ForNext::new();
        ctx.increase_depth();

        run(&mut for_next, &mut ctx, "for i := 0; i < 3; i += 1 do");
        ctx.increase_depth();
        run(&mut for_next, &mut ctx, "for j from 1 to 3 do");
        ctx.increase_depth();
        assert_eq!(run(&mut for_next, &mut ctx, "next;"), "END;");
        ctx.decrease_depth();
        assert_eq!(run(&mut for_next, &mut ctx, "next;"), "i += 1; END;");
    }

    #[test]
    fn test_loop_closed_by_end_is_dropped() {
        let mut ctx = CompilerContext::new(PplusConfig::default());
        let mut for_next = ForNext::new();
        ctx.increase_depth();

        run(&mut for_next, &mut ctx, "for k := 1; k < 2; k += 1 do");
        ctx.increase_depth();
        ctx.decrease_depth();
        run(&mut for_next, &mut ctx, "for ; a; do");
        ctx.increase_depth();
        assert_eq!(run(&mut for_next, &mut ctx, "next"), "END;");
    }
}
