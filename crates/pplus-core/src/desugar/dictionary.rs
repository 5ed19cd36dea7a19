/*!
# Dictionaries

```text
dict field1, field2[3], field3 := {1,2} name;
```

A dictionary gives names to the parts of one PPL variable. Each field
becomes an alias `name.field`: to its explicit value when one is given,
to `name` followed by the field's suffix (`name[3]`) when it has one, and
to `name` itself otherwise.
*/

use super::{split_top_level, Desugarer};
use crate::aliases::{Identity, IdentityKind};
use crate::context::CompilerContext;

#[derive(Debug, Default)]
pub struct Dictionary;

impl Dictionary {
    pub fn new() -> Self {
        Self
    }
}

impl Desugarer for Dictionary {
    fn name(&self) -> &'static str {
        "dict"
    }

    fn description(&self) -> &'static str {
        "expands dict field lists into member aliases"
    }

    fn apply(&mut self, line: &mut String, ctx: &mut CompilerContext) -> bool {
        let Some(caps) = static_regex!(r"^dict\s+(.+)\s+([A-Za-z_]\w*)\s*;$").captures(line.trim()) else {
            return false;
        };
        let name = caps[2].to_string();

        for field in split_top_level(&caps[1], ',') {
            let (head, value) = match field.split_once(":=") {
                Some((head, value)) => (head.trim(), Some(value.trim())),
                None => (field.trim(), None),
            };
            let Some(field_caps) = static_regex!(r"^([A-Za-z_]\w*)(.*)$").captures(head) else {
                ctx.error(format!("invalid dict field '{}'", field.trim()));
                continue;
            };

            let suffix = field_caps[2].trim();
            let real = match value {
                Some(value) => value.to_string(),
                None if !suffix.is_empty() => format!("{name}{suffix}"),
                None => name.clone(),
            };

            let identity = Identity::new(format!("{name}.{}", &field_caps[1]), real, IdentityKind::Member);
            let site = ctx.site();
            ctx.aliases.append(identity, &site, &mut ctx.diagnostics);
        }

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
    fn test_dictionary_fields() {
        let mut ctx = CompilerContext::new(PplusConfig::default());
        let mut line = "dict count, items[2], origin := {0,0}, self pt;".to_string();
        assert!(Dictionary::new().apply(&mut line, &mut ctx));
        assert!(line.is_empty());

        let real = |id: &str| ctx.aliases.get_identity(id).map(|i| i.real.clone());
        assert_eq!(real("pt.count"), Some("pt".to_string()));
        assert_eq!(real("pt.items"), Some("pt[2]".to_string()));
        assert_eq!(real("pt.origin"), Some("{0,0}".to_string()));
        assert_eq!(real("pt.self"), Some("pt".to_string()));
    }

    #[test]
    fn test_not_a_dictionary() {
        let mut ctx = CompilerContext::new(PplusConfig::default());
        let mut line = "dictionary := 3;".to_string();
        assert!(!Dictionary::new().apply(&mut line, &mut ctx));
    }
}
