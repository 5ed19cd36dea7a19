/*!
# Switch

```text
switch key              CASE
    case 1 do      ->       IF key == 1 THEN
        ...                     ...
    end;                    END;
end;                    END;
```

A subject that is not a plain name is first stored in a generated local
(`LOCAL swN := expr;`). Switches nest; each one remembers the depth of its
`CASE` body so that `case` lines of an inner switch never pick up the
subject of an outer one.

A first branch may share the switch line: `switch x; case 1 do y:=1; end;`
puts `IF x == 1 THEN y:=1; end;` on its own line after `CASE`.
*/

use tracing::debug;

use super::{split_top_level, Desugarer};
use crate::context::CompilerContext;
use crate::pattern::is_plain_identifier;

#[derive(Debug, Clone, PartialEq, Eq)]
struct OpenSwitch {
    subject: String,
    level: usize,
}

#[derive(Debug, Default)]
pub struct Switch {
    open: Vec<OpenSwitch>,
    counter: usize,
}

impl Switch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every switch and restart subject naming, called at file level
    pub fn reset(&mut self) {
        self.open.clear();
        self.counter = 0;
    }

    pub fn open_switches(&self) -> usize {
        self.open.len()
    }
}

impl Desugarer for Switch {
    fn name(&self) -> &'static str {
        "switch"
    }

    fn description(&self) -> &'static str {
        "lowers switch/case to CASE with IF branches"
    }

    fn apply(&mut self, line: &mut String, ctx: &mut CompilerContext) -> bool {
        let depth = ctx.depth();
        if depth == 0 {
            return false;
        }

        if let Some(caps) = static_regex!(r"^(\s*)switch\s+(.+)$").captures(line) {
            let indent = caps[1].to_string();
            let body = caps[2].to_string();
            // `switch x; case 1 do ...` carries its first branch on the same line
            let mut statements = split_top_level(&body, ';').into_iter();
            let expression = statements.next().unwrap_or_default().trim().to_string();
            let rest = statements.collect::<Vec<_>>().join(";").trim().to_string();
            if expression.is_empty() {
                return false;
            }

            let (subject, mut rewritten) = if is_plain_identifier(&expression) {
                (expression.clone(), format!("{indent}CASE"))
            } else {
                self.counter += 1;
                let local = format!("sw{}", self.counter);
                let rewritten = format!("{indent}LOCAL {local} := {expression};\n{indent}CASE");
                (local, rewritten)
            };
            if !rest.is_empty() {
                let branches = case_branches(&subject, &rest).unwrap_or(rest);
                rewritten.push('\n');
                rewritten.push_str(&indent);
                rewritten.push_str(&branches);
            }
            debug!("switch on '{}' at level {}", expression, depth + 1);
            self.open.push(OpenSwitch {
                subject,
                level: depth + 1,
            });
            *line = rewritten;
            return true;
        }

        self.open.retain(|s| s.level <= depth);
        let Some(current) = self.open.last() else {
            return false;
        };

        if current.level == depth && static_regex!(r"(?i)^\s*end\s*;?\s*$").is_match(line) {
            self.open.pop();
            return false;
        }

        if current.level != depth {
            return false;
        }
        match case_branches(&current.subject, line) {
            Some(branches) => {
                *line = branches;
                true
            }
            None => false,
        }
    }
}

/// Every `case value do` of `text` as `IF subject == value THEN`
fn case_branches(subject: &str, text: &str) -> Option<String> {
    let case = static_regex!(r"\bcase\s+(.+?)\s+do\b");
    if !case.is_match(text) {
        return None;
    }
    let branch = format!("IF {} == $1 THEN", subject.replace('$', "$$"));
    Some(case.replace_all(text, branch.as_str()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PplusConfig;
    use pretty_assertions::assert_eq;

    fn run(switch: &mut Switch, ctx: &mut CompilerContext, text: &str) -> String {
        let mut line = text.to_string();
        switch.apply(&mut line, ctx);
        line
    }

    #[test]
    fn test_plain_subject() {
        let mut ctx = CompilerContext::new(PplusConfig::default());
        let mut switch = Switch::new();
        ctx.increase_depth();

        assert_eq!(run(&mut switch, &mut ctx, "switch x"), "CASE");
        ctx.increase_depth();
        assert_eq!(run(&mut switch, &mut ctx, "  case 1 do y := 1; end;"), "  IF x == 1 THEN y := 1; end;");
        assert_eq!(run(&mut switch, &mut ctx, "end;"), "end;");
        assert_eq!(switch.open_switches(), 0);
    }

    #[test]
    fn test_expression_subject() {
        let mut ctx = CompilerContext::new(PplusConfig::default());
        let mut switch = Switch::new();
        ctx.increase_depth();

        assert_eq!(run(&mut switch, &mut ctx, "switch GETKEY"), "CASE");
        switch.reset();
        assert_eq!(
            run(&mut switch, &mut ctx, "  switch a + b;"),
            "  LOCAL sw1 := a + b;\n  CASE"
        );
    }

    #[test]
    fn test_branch_on_the_switch_line() {
        let mut ctx = CompilerContext::new(PplusConfig::default());
        let mut switch = Switch::new();
        ctx.increase_depth();

        assert_eq!(
            run(&mut switch, &mut ctx, "switch x; case 1 do y:=1; end;"),
            "CASE\nIF x == 1 THEN y:=1; end;"
        );
        assert_eq!(switch.open_switches(), 1);
        assert_eq!(
            run(&mut switch, &mut ctx, "  switch a + b; case 2 do c := 0; end;"),
            "  LOCAL sw1 := a + b;\n  CASE\n  IF sw1 == 2 THEN c := 0; end;"
        );
    }

    #[test]
    fn test_nested_switches_use_their_own_subject() {
        let mut ctx = CompilerContext::new(PplusConfig::default());
        let mut switch = Switch::new();
        ctx.increase_depth();

        run(&mut switch, &mut ctx, "switch outer");
        ctx.increase_depth(); // CASE
        run(&mut switch, &mut ctx, "case 1 do");
        ctx.increase_depth(); // IF
        run(&mut switch, &mut ctx, "switch inner");
        ctx.increase_depth(); // CASE
        assert_eq!(run(&mut switch, &mut ctx, "case 2 do"), "IF inner == 2 THEN");
        assert_eq!(run(&mut switch, &mut ctx, "end;"), "end;");
        ctx.decrease_depth();
        ctx.decrease_depth();
        assert_eq!(run(&mut switch, &mut ctx, "case 3 do"), "IF outer == 3 THEN");
    }

    #[test]
    fn test_file_level_is_ignored() {
        let mut ctx = CompilerContext::new(PplusConfig::default());
        let mut switch = Switch::new();
        assert_eq!(run(&mut switch, &mut ctx, "switch x"), "switch x");
    }
}
