//! `def` and `undef` statements.
//!
//! `def real ident[(params)] [@deprecated ["message"]];` makes `ident` another
//! spelling of the PPL text `real`. `undef ident;` removes it again.

use tracing::debug;

use super::Desugarer;
use crate::aliases::{Identity, IdentityKind};
use crate::context::CompilerContext;

#[derive(Debug, Default)]
pub struct Def;

impl Def {
    pub fn new() -> Self {
        Self
    }
}

impl Desugarer for Def {
    fn name(&self) -> &'static str {
        "def"
    }

    fn description(&self) -> &'static str {
        "declares identifiers standing for PPL text, optionally deprecated"
    }

    fn apply(&mut self, line: &mut String, ctx: &mut CompilerContext) -> bool {
        let trimmed = line.trim();

        if let Some(caps) = static_regex!(r"^undef\s+([A-Za-z_][\w.:]*)\s*;$").captures(trimmed) {
            if ctx.aliases.remove(&caps[1]).is_none() {
                debug!("undef of unknown '{}'", &caps[1]);
            }
            line.clear();
            return true;
        }

        let Some(caps) = static_regex!(
            r#"^def\s+(.+?)\s+(`[^`]+`|[A-Za-z_][\w.]*(?:::[A-Za-z_][\w.]*)*)(?:\(([A-Za-z_\s,]*)\))?\s*(@deprecated(?:\s+"([^"]*)")?)?\s*;$"#
        )
        .captures(trimmed) else {
            return false;
        };

        let parameters: Vec<String> = caps
            .get(3)
            .map(|m| {
                m.as_str()
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let mut identity = Identity::new(&caps[2], &caps[1], IdentityKind::Def).with_parameters(parameters);
        if caps.get(4).is_some() {
            identity = identity.deprecated(caps.get(5).map(|m| m.as_str()).unwrap_or_default());
        }

        let site = ctx.site();
        ctx.aliases.append(identity, &site, &mut ctx.diagnostics);
        line.clear();
        true
    }
}
