//! `alias [@]name := real;` statements and namespace directives.
//!
//! `using namespace ns;` makes `ns::name` aliases reachable as `name` until
//! the block it appears in ends; `remove namespace ns;` closes it early.

use super::Desugarer;
use crate::aliases::{Identity, IdentityKind, Scope};
use crate::context::CompilerContext;

#[derive(Debug, Default)]
pub struct AliasStatement;

impl AliasStatement {
    pub fn new() -> Self {
        Self
    }
}

impl Desugarer for AliasStatement {
    fn name(&self) -> &'static str {
        "alias"
    }

    fn description(&self) -> &'static str {
        "names a piece of PPL text, globally with @"
    }

    fn apply(&mut self, line: &mut String, ctx: &mut CompilerContext) -> bool {
        let Some(caps) = static_regex!(r"^alias\s+(@\s*)?([A-Za-z_][\w.]*(?:::[A-Za-z_]\w*)*)\s*:=\s*(.+?)\s*;$")
            .captures(line.trim())
        else {
            return false;
        };

        let scope = if caps.get(1).is_some() {
            Scope::GLOBAL
        } else {
            Scope::Level(ctx.depth())
        };
        let identity = Identity::new(&caps[2], &caps[3], IdentityKind::Alias).with_scope(scope);

        let site = ctx.site();
        ctx.aliases.append(identity, &site, &mut ctx.diagnostics);
        line.clear();
        true
    }
}

#[derive(Debug, Default)]
pub struct Namespaces;

impl Namespaces {
    pub fn new() -> Self {
        Self
    }
}

impl Desugarer for Namespaces {
    fn name(&self) -> &'static str {
        "namespace"
    }

    fn description(&self) -> &'static str {
        "opens and closes namespaces for alias lookup"
    }

    fn apply(&mut self, line: &mut String, ctx: &mut CompilerContext) -> bool {
        let Some(caps) = static_regex!(r"^(using|remove)\s+namespace\s+([A-Za-z_]\w*(?:::[A-Za-z_]\w*)*)\s*;$")
            .captures(line.trim())
        else {
            return false;
        };

        if &caps[1] == "using" {
            ctx.aliases.add_namespace(&caps[2], ctx.depth());
        } else {
            ctx.aliases.remove_namespace(&caps[2]);
        }
        line.clear();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PplusConfig;

    #[test]
    fn test_alias_scopes() {
        let mut ctx = CompilerContext::new(PplusConfig::default());
        ctx.increase_depth();
        ctx.increase_depth();

        for text in ["alias width := G1.Width;", "alias @ screen := G0;"] {
            let mut line = text.to_string();
            assert!(AliasStatement::new().apply(&mut line, &mut ctx));
            assert!(line.is_empty());
        }

        assert_eq!(ctx.aliases.get_identity("width").unwrap().scope, Scope::Level(2));
        assert_eq!(ctx.aliases.get_identity("screen").unwrap().scope, Scope::GLOBAL);

        ctx.decrease_depth();
        assert!(!ctx.aliases.identifier_exists("width"));
        assert!(ctx.aliases.identifier_exists("screen"));
    }

    #[test]
    fn test_namespaces() {
        let mut ctx = CompilerContext::new(PplusConfig::default());
        let mut line = "alias @ gfx::width := W;".to_string();
        AliasStatement::new().apply(&mut line, &mut ctx);

        ctx.increase_depth();
        let mut line = "using namespace gfx;".to_string();
        assert!(Namespaces::new().apply(&mut line, &mut ctx));
        assert!(line.is_empty());
        assert_eq!(ctx.aliases.namespace_names(), vec!["gfx".to_string()]);

        let location = ctx.location();
        let resolved = ctx
            .aliases
            .resolve_all_aliases_in_text("x := width;", &mut ctx.diagnostics, &location);
        assert_eq!(resolved, "x := W;");

        ctx.decrease_depth();
        assert!(ctx.aliases.namespace_names().is_empty());

        let mut line = "remove namespace gfx;".to_string();
        assert!(Namespaces::new().apply(&mut line, &mut ctx));
    }

    #[test]
    fn test_requires_assignment() {
        let mut ctx = CompilerContext::new(PplusConfig::default());
        let mut line = "alias x;".to_string();
        assert!(!AliasStatement::new().apply(&mut line, &mut ctx));
        assert_eq!(line, "alias x;");
    }
}
