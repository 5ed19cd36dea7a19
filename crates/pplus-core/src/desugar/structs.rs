/*!
# Structures

A structure is a named list of member declarations:

```text
struct Point
    x[1]; y[2];
end;
```

Declaring instances of it

```text
struct Point origin, auto:cursor, s9:corner;
```

creates one alias per member (`origin.x` stands for `origin[1]`) and
rewrites the line to an ordinary `var` declaration of the instances, which
the auto naming pass then lowers. Instance names that PPL cannot use, such
as `my.point`, get a generated `sN` name.

Structures declared inside a block are forgotten when the translator
returns to file level.
*/

use tracing::debug;

use super::{split_top_level, Desugarer};
use crate::aliases::{Identity, IdentityKind};
use crate::context::CompilerContext;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Structure {
    pub identifier: String,
    pub members: Vec<String>,
    pub local: bool,
}

#[derive(Debug, Default)]
pub struct Structs {
    structures: Vec<Structure>,
    open: Option<Structure>,
    counter: usize,
}

impl Structs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identifier: &str) -> Option<&Structure> {
        self.structures.iter().find(|s| s.identifier == identifier)
    }

    /// Forget structures declared inside blocks and restart instance naming
    pub fn remove_local_structs(&mut self) {
        self.structures.retain(|s| {
            if s.local {
                debug!("struct '{}' removed", s.identifier);
            }
            !s.local
        });
        self.counter = 0;
    }

    fn generated_name(&mut self, ctx: &CompilerContext) -> String {
        loop {
            self.counter += 1;
            let name = format!("s{}", self.counter);
            if !ctx.aliases.real_exists(&name) {
                return name;
            }
        }
    }

    /// The real PPL name and the alias (if any) of one instance declaration
    fn instance_names(&mut self, name: &str, ctx: &CompilerContext) -> (String, String) {
        if let Some(caps) = static_regex!(r"^([A-Za-z]\w*):([A-Za-z_][\w.]*(?:::[A-Za-z_]\w*)*)$").captures(name) {
            let real = match &caps[1] {
                "auto" => self.generated_name(ctx),
                real => real.to_string(),
            };
            return (real, caps[2].to_string());
        }
        if name.contains('.') || name.contains(':') {
            return (self.generated_name(ctx), name.to_string());
        }
        (name.to_string(), name.to_string())
    }

    fn define_members(structure: &Structure, real: &str, identifier: &str, ctx: &mut CompilerContext) {
        let token = static_regex!(r"[A-Za-z][\w.]*");
        for member in &structure.members {
            let Some(name) = token.find(member) else {
                ctx.error(format!("invalid member '{member}' in struct '{}'", structure.identifier));
                continue;
            };
            let member_real = token.replace_all(member, regex::NoExpand(real)).into_owned();
            let identity = Identity::new(
                format!("{identifier}.{}", name.as_str()),
                member_real,
                IdentityKind::Member,
            );
            let site = ctx.site();
            ctx.aliases.append(identity, &site, &mut ctx.diagnostics);
        }
    }

    fn instantiate(&mut self, line: &mut String, ctx: &mut CompilerContext) -> bool {
        let Some(caps) = static_regex!(r"^(\s*)struct\s+([A-Za-z]\w*)\s+([^;]+);(.*)$").captures(line) else {
            return false;
        };
        let Some(structure) = self.get(&caps[2]).cloned() else {
            return false;
        };

        let mut declarations = Vec::new();
        for name in split_top_level(&caps[3], ',') {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let (real, identifier) = self.instance_names(name, ctx);
            let exists = ctx.aliases.real_exists(&real);
            Self::define_members(&structure, &real, &identifier, ctx);
            if exists {
                continue;
            }

            let mut declaration = real.clone();
            if identifier != real {
                declaration.push(':');
                declaration.push_str(&identifier);
            }
            declaration.push_str(" := {}");
            declarations.push(declaration);
        }

        *line = if declarations.is_empty() {
            caps[4].trim().to_string()
        } else {
            format!("{}var {};{}", &caps[1], declarations.join(", "), &caps[4])
        };
        true
    }
}

impl Desugarer for Structs {
    fn name(&self) -> &'static str {
        "struct"
    }

    fn description(&self) -> &'static str {
        "records structure declarations and expands their instances"
    }

    fn apply(&mut self, line: &mut String, ctx: &mut CompilerContext) -> bool {
        let trimmed = line.trim();

        if let Some(mut structure) = self.open.take() {
            if static_regex!(r"(?i)^end\s*;$").is_match(trimmed) {
                debug!(
                    "struct '{}' defined with {} members",
                    structure.identifier,
                    structure.members.len()
                );
                self.structures.retain(|s| s.identifier != structure.identifier);
                self.structures.push(structure);
            } else {
                structure.members.extend(
                    trimmed
                        .split(';')
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(String::from),
                );
                self.open = Some(structure);
            }
            line.clear();
            return true;
        }

        if let Some(caps) = static_regex!(r"^struct\s+([A-Za-z]\w*)$").captures(trimmed) {
            if self.get(&caps[1]).is_some() {
                ctx.warning(format!("redefinition of struct '{}'", &caps[1]));
            }
            self.open = Some(Structure {
                identifier: caps[1].to_string(),
                members: Vec::new(),
                local: ctx.depth() > 0,
            });
            line.clear();
            return true;
        }

        self.instantiate(line, ctx)
    }
}
