/*!
# Operators

Maps C style operators onto PPL:

| P+ | PPL |
|---|---|
| `>=` `<=` `!=` `<>` `=>` | `≥` `≤` `≠` `≠` `▶` |
| `x += y` (and `-= *= /= %=`) | `x := x + y` |
| `%` | `MOD` |
| `&&` `\|\|` `^^` `!` | `AND` `OR` `XOR` `NOT` |
| `<int>(x)` `<string>(x)` | `IP(x)` `STRING(x)` |
| `true` `false` `pi` | `1` `0` `π` |
| `=` | `:=` |

`==` and an existing `:=` are left alone when `=` is turned into `:=`.
*/

use regex::Captures;

use super::Desugarer;
use crate::context::CompilerContext;

#[derive(Debug, Default)]
pub struct Operators;

impl Operators {
    pub fn new() -> Self {
        Self
    }
}

/// Turn every lone `=` into `:=`
pub fn convert_assignments(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len() + 8);

    for (i, &c) in chars.iter().enumerate() {
        if c != '=' {
            out.push(c);
            continue;
        }
        let prev = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();
        let part_of_operator = matches!(prev, Some(':' | '<' | '>' | '!' | '=')) || next == Some('=');
        if !part_of_operator {
            out.push(':');
        }
        out.push('=');
    }

    out
}

/// Replace `!` with `NOT`, keeping words apart
fn convert_not(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + 8);
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '!' {
            out.push(c);
            continue;
        }
        if !(out.is_empty() || out.ends_with([' ', '('])) {
            out.push(' ');
        }
        out.push_str("NOT ");
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    out
}

impl Desugarer for Operators {
    fn name(&self) -> &'static str {
        "operators"
    }

    fn description(&self) -> &'static str {
        "maps C style operators and constants onto PPL"
    }

    fn apply(&mut self, line: &mut String, _ctx: &mut CompilerContext) -> bool {
        let mut out = static_regex!(r"<int>\s*\(").replace_all(line, "IP(").into_owned();
        out = static_regex!(r"<string>\s*\(").replace_all(&out, "STRING(").into_owned();

        for (from, to) in [(">=", "≥"), ("<=", "≤"), ("!=", "≠"), ("<>", "≠"), ("=>", "▶")] {
            out = out.replace(from, to);
        }

        out = static_regex!(r"([A-Za-z_]\w*(?:\[[^\]]*\])*)\s*([-+*/%])=")
            .replace_all(&out, |caps: &Captures| format!("{0} := {0} {1}", &caps[1], &caps[2]))
            .into_owned();

        out = static_regex!(r"\s*%\s*").replace_all(&out, " MOD ").into_owned();
        out = static_regex!(r"\s*&&\s*").replace_all(&out, " AND ").into_owned();
        out = static_regex!(r"\s*\|\|\s*").replace_all(&out, " OR ").into_owned();
        out = static_regex!(r"\s*\^\^\s*").replace_all(&out, " XOR ").into_owned();
        if out.contains('!') {
            out = convert_not(&out);
        }

        out = static_regex!(r"\btrue\b").replace_all(&out, "1").into_owned();
        out = static_regex!(r"\bfalse\b").replace_all(&out, "0").into_owned();
        out = static_regex!(r"\bpi\b").replace_all(&out, "π").into_owned();

        out = convert_assignments(&out);

        if out == *line {
            return false;
        }
        *line = out;
        true
    }
}
