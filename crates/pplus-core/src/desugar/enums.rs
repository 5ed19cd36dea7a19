/*!
# Enumerations

```text
enum Color
    Red := 1, Green := #2:8h, Blue = 4;
end;
```

Every item becomes an enumerator alias reachable both as `Color::Red`
and, for older sources, as `Color.Red`. Values must be numbers or sized
integer literals.
*/

use super::Desugarer;
use crate::aliases::{Identity, IdentityKind};
use crate::context::CompilerContext;

#[derive(Debug, Default)]
pub struct Enums {
    open: Option<String>,
}

impl Enums {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while the items of an enumeration are being read
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    fn define_items(name: &str, text: &str, ctx: &mut CompilerContext) {
        let item = static_regex!(
            r"([A-Za-z]\w*)\s*:?=\s*(#[0-9A-F]+(?::-?\d+)?[bodh]?|-?\d+(?:\.\d+)?(?:[eE]-?\d+)?)"
        );
        for caps in item.captures_iter(text) {
            for identifier in [format!("{name}::{}", &caps[1]), format!("{name}.{}", &caps[1])] {
                let identity = Identity::new(identifier, &caps[2], IdentityKind::Enumerator);
                let site = ctx.site();
                ctx.aliases.append(identity, &site, &mut ctx.diagnostics);
            }
        }
    }
}

impl Desugarer for Enums {
    fn name(&self) -> &'static str {
        "enum"
    }

    fn description(&self) -> &'static str {
        "registers enumerators as Name::item and Name.item"
    }

    fn apply(&mut self, line: &mut String, ctx: &mut CompilerContext) -> bool {
        let trimmed = line.trim();

        if let Some(name) = self.open.take() {
            if !static_regex!(r"(?i)^end\s*;$").is_match(trimmed) {
                Self::define_items(&name, trimmed, ctx);
                self.open = Some(name);
            }
            line.clear();
            return true;
        }

        let Some(caps) = static_regex!(r"^enum\s+([A-Za-z]\w*)$").captures(trimmed) else {
            return false;
        };
        self.open = Some(caps[1].to_string());
        line.clear();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PplusConfig;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_enumeration() {
        let mut ctx = CompilerContext::new(PplusConfig::default());
        let mut enums = Enums::new();

        for text in ["enum Color", "Red := 1, Green := #2:8h,", "Blue = 4.5;", "end;"] {
            let mut line = text.to_string();
            assert!(enums.apply(&mut line, &mut ctx));
            assert_eq!(line, "");
        }
        assert!(!enums.is_open());

        let real = |id: &str| ctx.aliases.get_identity(id).map(|i| i.real.clone());
        assert_eq!(real("Color::Red"), Some("1".to_string()));
        assert_eq!(real("Color.Red"), Some("1".to_string()));
        assert_eq!(real("Color::Green"), Some("#2:8h".to_string()));
        assert_eq!(real("Color::Blue"), Some("4.5".to_string()));
    }

    #[test]
    fn test_not_an_enum() {
        let mut ctx = CompilerContext::new(PplusConfig::default());
        let mut line = "enumerate := 1;".to_string();
        assert!(!Enums::new().apply(&mut line, &mut ctx));
    }
}
