/*!
# Auto Naming

PPL names are short and flat. P+ lets declarations carry a readable alias:

```text
EXPORT auto:draw.line(auto:from, auto:to)   -> EXPORT fn1(p1, p2)
var count:n, auto:total := 0;               -> LOCAL count, v1 := 0;
```

`real:alias` keeps `real` as the PPL name and registers `alias` for it;
`auto:alias`, or an alias PPL cannot spell (`a.b`, `ns::a`), gets a
generated name: `fnN` for functions, `pN` for parameters, `gN` for file
level variables and `vN` inside blocks. `N` is written in the calculator's
base-32 digits and names already standing behind an alias are skipped.
*/

use tracing::debug;

use super::{split_top_level, Desugarer};
use crate::aliases::{Identity, IdentityKind, Scope};
use crate::context::CompilerContext;

const BASE32_DIGITS: &[u8; 32] = b"0123456789ABCDEFGHIJKLMNabcdefgh";

/// `n` in the calculator's base-32 digit set
pub fn base32(mut n: usize) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE32_DIGITS[n % 32] as char);
        n /= 32;
    }
    digits.iter().rev().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameClass {
    Function,
    Parameter,
    Global,
    Local,
}

impl NameClass {
    fn prefix(self) -> &'static str {
        match self {
            NameClass::Function => "fn",
            NameClass::Parameter => "p",
            NameClass::Global => "g",
            NameClass::Local => "v",
        }
    }
}

#[derive(Debug, Default)]
pub struct AutoNaming {
    functions: usize,
    parameters: usize,
    globals: usize,
    locals: usize,
}

impl AutoNaming {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart block variable naming, called when a function body ends
    pub fn reset_locals(&mut self) {
        self.locals = 0;
    }

    fn generate(&mut self, class: NameClass, ctx: &CompilerContext) -> String {
        loop {
            let counter = match class {
                NameClass::Function => &mut self.functions,
                NameClass::Parameter => &mut self.parameters,
                NameClass::Global => &mut self.globals,
                NameClass::Local => &mut self.locals,
            };
            *counter += 1;
            let name = format!("{}{}", class.prefix(), base32(*counter));
            if !ctx.aliases.real_exists(&name) {
                return name;
            }
        }
    }

    /// Split `real:alias`, `auto:alias` or an unspellable alias into the
    /// PPL name and the alias to register for it
    fn name(&mut self, head: &str, class: NameClass, ctx: &CompilerContext) -> (String, Option<String>) {
        let head = head.trim();
        if let Some(caps) = static_regex!(r"^([A-Za-z]\w*)\s*:\s*([A-Za-z_][\w.]*(?:::[A-Za-z_][\w.]*)*)$").captures(head) {
            let alias = caps[2].to_string();
            if let Some(existing) = ctx.aliases.get_identity(&alias) {
                return (existing.real.clone(), None);
            }
            let real = match &caps[1] {
                "auto" => self.generate(class, ctx),
                real => real.to_string(),
            };
            return (real, Some(alias));
        }
        if static_regex!(r"^[A-Za-z_]\w*(?:::|\.)[\w.:]*$").is_match(head) {
            if let Some(existing) = ctx.aliases.get_identity(head) {
                return (existing.real.clone(), None);
            }
            return (self.generate(class, ctx), Some(head.to_string()));
        }
        (head.to_string(), None)
    }

    fn register(alias: String, real: &str, kind: IdentityKind, scope: Scope, ctx: &mut CompilerContext) {
        debug!("{} '{}' named '{}'", kind, alias, real);
        let identity = Identity::new(alias, real, kind).with_scope(scope);
        let site = ctx.site();
        ctx.aliases.append(identity, &site, &mut ctx.diagnostics);
    }

    fn declarations(&mut self, line: &mut String, ctx: &mut CompilerContext) -> bool {
        let Some(caps) = static_regex!(r"(?i)^(\s*)(var|local|const)\s+(.*)$").captures(line) else {
            return false;
        };
        // `LOCAL name(...)` at file level declares a function
        if ctx.depth() == 0 && static_regex!(r"^[A-Za-z_][\w.:\s]*\(").is_match(&caps[3]) {
            return false;
        }
        let indent = caps[1].to_string();
        let keyword = if caps[2].eq_ignore_ascii_case("const") { "CONST" } else { "LOCAL" };
        let rest = caps[3].to_string();

        let statements = split_top_level(&rest, ';');
        let declaration = statements.first().copied().unwrap_or_default();
        let remainder = statements[1..].join(";");

        let class = if ctx.depth() == 0 { NameClass::Global } else { NameClass::Local };
        let mut items = Vec::new();
        for item in split_top_level(declaration, ',') {
            let (head, init) = split_initializer(item);
            if head.is_empty() {
                continue;
            }
            let (real, alias) = self.name(head, class, ctx);
            if let Some(alias) = alias {
                Self::register(alias, &real, IdentityKind::Variable, Scope::Auto, ctx);
            }
            items.push(match init {
                Some(init) => format!("{real} := {}", init.trim()),
                None => real,
            });
        }

        let mut out = format!("{indent}{keyword} {}", items.join(", "));
        if statements.len() > 1 {
            out.push(';');
            out.push_str(&remainder);
        }
        *line = out;
        true
    }

    fn function_header(&mut self, line: &mut String, ctx: &mut CompilerContext) -> bool {
        if ctx.depth() > 0 {
            return false;
        }
        let Some(caps) = static_regex!(
            r"^(\s*)((?i:export|local)\s+)?([A-Za-z_][\w.]*(?:\s*:\s*[A-Za-z_][\w.]*)?(?:::[A-Za-z_][\w.]*)*)\s*\(([^()]*)\)(.*)$"
        )
        .captures(line) else {
            return false;
        };

        let head = caps[3].to_string();
        let parameters = caps[4].to_string();
        if !head.contains([':', '.']) && !parameters.contains([':', '.']) {
            return false;
        }
        let indent = caps[1].to_string();
        let export = caps.get(2).map(|m| m.as_str().trim().to_uppercase());
        let tail = caps[5].to_string();
        let forward = tail.trim_end().ends_with(';');

        let (function, alias) = self.name(&head, NameClass::Function, ctx);
        if let Some(alias) = alias {
            Self::register(alias, &function, IdentityKind::Function, Scope::GLOBAL, ctx);
        }

        self.parameters = 0;
        let mut names = Vec::new();
        for parameter in split_top_level(&parameters, ',') {
            let parameter = parameter.trim();
            if parameter.is_empty() {
                continue;
            }
            let (real, alias) = self.name(parameter, NameClass::Parameter, ctx);
            if let (Some(alias), false) = (alias, forward) {
                Self::register(alias, &real, IdentityKind::Argument, Scope::Level(1), ctx);
            }
            names.push(real);
        }

        let export = export.map(|e| format!("{e} ")).unwrap_or_default();
        *line = format!("{indent}{export}{function}({}){tail}", names.join(","));
        true
    }
}

/// Split a declaration item at its `:=` (or plain `=`) initializer
fn split_initializer(item: &str) -> (&str, Option<&str>) {
    let bytes = item.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'=' {
            continue;
        }
        if i > 0 && bytes[i - 1] == b':' {
            return (item[..i - 1].trim(), Some(&item[i + 1..]));
        }
        if bytes.get(i + 1) != Some(&b'=') && (i == 0 || !b"<>!=".contains(&bytes[i - 1])) {
            return (item[..i].trim(), Some(&item[i + 1..]));
        }
    }
    (item.trim(), None)
}

impl Desugarer for AutoNaming {
    fn name(&self) -> &'static str {
        "auto"
    }

    fn description(&self) -> &'static str {
        "lowers named and auto declarations of variables, functions and parameters"
    }

    fn apply(&mut self, line: &mut String, ctx: &mut CompilerContext) -> bool {
        self.declarations(line, ctx) || self.function_header(line, ctx)
    }
}
