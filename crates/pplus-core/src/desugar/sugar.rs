/*!
# Keyword and Flow Sugar

Small rewrites that map P+ spellings onto PPL keywords:

- `try` / `catch` to `IFERR` / `THEN`
- `endif`, `wend`, `loop`, `next` and lowercase `end` to `END;`
- `if ... do` to `IF ... THEN`, and a one-line `if ... then return;` gets
  its `END;`
- `guard cond else` to `IF NOT(cond) THEN` (deprecated)
- `a...b` to `a TO b` and a lone `do` to `WHILE 1 DO`
- lowercase keywords and math functions to uppercase
- a bare `K_Name` at file level to the key handler `KEY K_Name()`
- `#16h(FF)` to the sized literal `#FF:16h`

The flow rewrites only apply inside blocks.
*/

use regex::Captures;

use super::Desugarer;
use crate::context::CompilerContext;

const KEYWORDS: &[&str] = &[
    "begin", "return", "kill", "if", "then", "else", "xor", "or", "and", "not", "case", "default", "iferr",
    "ifte", "for", "from", "step", "downto", "to", "do", "while", "repeat", "until", "break", "continue",
    "export", "const", "local", "key",
];

const MATH_FUNCTIONS: &[&str] = &["log", "cos", "sin", "tan", "ln", "min", "max", "abs", "sqrt"];

#[derive(Debug, Default)]
pub struct Sugar;

impl Sugar {
    pub fn new() -> Self {
        Self
    }

    fn block_sugar(line: &str, ctx: &mut CompilerContext) -> String {
        let mut line = line.to_string();

        let guard = static_regex!(r"\bguard\s+(.+?)\s+else\b");
        if guard.is_match(&line) {
            ctx.report(
                crate::Severity::Deprecated,
                "guard is deprecated, use if ... then ... end;",
            );
            line = guard.replace_all(&line, "IF NOT($1) THEN").into_owned();
        }

        line = static_regex!(r"(?i)\b(if\s+.+?)\s+do\s*$")
            .replace(&line, "$1 THEN")
            .into_owned();

        if static_regex!(r"(?i)\bif\s+.+\s+then\s+(?:return|break|continue)\b[^;]*;\s*$").is_match(&line) {
            line = format!("{} END;", line.trim_end());
        }

        static_regex!(r"\s*\.\.\.\s*").replace_all(&line, " TO ").into_owned()
    }
}

/// Uppercase every lowercase PPL keyword and math function name
pub fn capitalize_keywords(line: &str) -> String {
    static_regex!(r"\b[a-z]+\b")
        .replace_all(line, |caps: &Captures| {
            let word = &caps[0];
            if KEYWORDS.contains(&word) || MATH_FUNCTIONS.contains(&word) {
                word.to_uppercase()
            } else {
                word.to_string()
            }
        })
        .into_owned()
}

/// `#[-]<width><base>(<digits>)` to `#<digits>:[-]<width><base>`
pub fn base_literals(line: &str) -> String {
    static_regex!(r"#(-)?(\d{1,2})([bodh])\(([0-9A-Fa-f]+)\)")
        .replace_all(line, |caps: &Captures| {
            format!(
                "#{}:{}{}{}",
                caps[4].to_uppercase(),
                caps.get(1).map_or("", |m| m.as_str()),
                &caps[2],
                &caps[3]
            )
        })
        .into_owned()
}

impl Desugarer for Sugar {
    fn name(&self) -> &'static str {
        "sugar"
    }

    fn description(&self) -> &'static str {
        "maps P+ keyword spellings and flow shortcuts onto PPL"
    }

    fn apply(&mut self, line: &mut String, ctx: &mut CompilerContext) -> bool {
        let mut out = if ctx.depth() > 0 {
            Self::block_sugar(line, ctx)
        } else {
            line.clone()
        };

        out = static_regex!(r"\btry\b").replace_all(&out, "IFERR").into_owned();
        out = static_regex!(r"\bcatch\b").replace_all(&out, "THEN").into_owned();
        out = static_regex!(r"(?i)\b(?:end(?:if)?|wend|next|loop)\b\s*;?")
            .replace_all(&out, "END;")
            .into_owned();
        out = static_regex!(r"^(\s*)do\s*$").replace(&out, "${1}WHILE 1 DO").into_owned();
        out = capitalize_keywords(&out);
        out = base_literals(&out);

        if ctx.depth() == 0 {
            out = static_regex!(r"^(\s*)(KS?A?_[A-Z\d][a-z]*)\s*$")
                .replace(&out, "${1}KEY ${2}()")
                .into_owned();
        }

        if out == *line {
            return false;
        }
        *line = out;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PplusConfig, Severity};
    use pretty_assertions::assert_eq;

    fn run(ctx: &mut CompilerContext, text: &str) -> String {
        let mut line = text.to_string();
        Sugar::new().apply(&mut line, ctx);
        line
    }

    fn in_block() -> CompilerContext {
        let mut ctx = CompilerContext::new(PplusConfig::default());
        ctx.increase_depth();
        ctx
    }

    #[test]
    fn test_keywords() {
        let mut ctx = in_block();
        assert_eq!(run(&mut ctx, "if a and not b then return x; end;"), "IF a AND NOT b THEN RETURN x; END;");
        assert_eq!(run(&mut ctx, "y := max(sin(x), 0);"), "y := MAX(SIN(x), 0);");
        assert_eq!(run(&mut ctx, "fortune := ending;"), "fortune := ending;");
    }

    #[test]
    fn test_end_variants() {
        let mut ctx = in_block();
        for text in ["endif;", "wend", "loop;", "end", "END;"] {
            assert_eq!(run(&mut ctx, text), "END;");
        }
    }

    #[test]
    fn test_flow_sugar() {
        let mut ctx = in_block();
        assert_eq!(run(&mut ctx, "if x > 1 do"), "IF x > 1 THEN");
        assert_eq!(run(&mut ctx, "if x then break;"), "IF x THEN BREAK; END;");
        assert_eq!(run(&mut ctx, "try"), "IFERR");
        assert_eq!(run(&mut ctx, "catch"), "THEN");
        assert_eq!(run(&mut ctx, "  do"), "  WHILE 1 DO");
        assert_eq!(run(&mut ctx, "for i from 1...10 do"), "FOR i FROM 1 TO 10 DO");
    }

    #[test]
    fn test_guard_is_deprecated() {
        let mut ctx = in_block();
        assert_eq!(run(&mut ctx, "guard x > 0 else"), "IF NOT(x > 0) THEN");
        assert_eq!(ctx.diagnostics.count(Severity::Deprecated), 1);
        assert!(!ctx.diagnostics.has_errors());
    }

    #[test]
    fn test_file_level() {
        let mut ctx = CompilerContext::new(PplusConfig::default());
        assert_eq!(run(&mut ctx, "K_Enter"), "KEY K_Enter()");
        assert_eq!(run(&mut ctx, "KSA_Up"), "KEY KSA_Up()");
        assert_eq!(run(&mut ctx, "export main()"), "EXPORT main()");
        assert_eq!(run(&mut ctx, "a...b"), "a...b");
    }

    #[test]
    fn test_base_literals() {
        assert_eq!(base_literals("x := #16h(ff);"), "x := #FF:16h;");
        assert_eq!(base_literals("#-8b(1010)"), "#1010:-8b");
    }
}
