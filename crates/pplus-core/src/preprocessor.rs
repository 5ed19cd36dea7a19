/*!
# Preprocessor

Interprets `#` directives line by line:

- `#include <lib>` / `#include "file"`
- `#define NAME[(params)] body`, `#undef NAME`
- `#ifdef`, `#ifndef`, `#if NAME <op> value`, `#else`, `#endif`
- `#pragma (options)` and the `#pragma mode(...)` passthrough
- `#PYTHON` / `#PPL` ... `#END` embedded blocks

Conditionals do not nest in the sense of evaluating inner conditions while
a region is being skipped; inner `#if*`/`#endif` pairs inside a skipped
region are counted so they do not end it early.
*/

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::aliases::{Identity, IdentityKind, Scope};
use crate::calc;
use crate::context::CompilerContext;
use crate::regexp::Comparison;

/// Default extension of library files included with `<...>`
pub const LIBRARY_EXTENSION: &str = "pplib";

/// Language of an embedded block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddedLanguage {
    Python,
    Ppl,
}

impl EmbeddedLanguage {
    pub fn marker(self) -> &'static str {
        match self {
            Self::Python => "#PYTHON",
            Self::Ppl => "#PPL",
        }
    }
}

/// What the caller must do with a line after preprocessing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Not a directive
    None,
    /// Directive handled, emit nothing
    Consumed,
    /// Translate the given file in place of this line
    Include(PathBuf),
    /// Emit the line unchanged
    PassThrough(String),
    EmbeddedStart(EmbeddedLanguage),
    EmbeddedEnd(EmbeddedLanguage),
}

/// Directive interpreter state
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    disregard: bool,
    skipped_conditionals: usize,
    embedded: Vec<EmbeddedLanguage>,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while lines are being skipped by a false conditional
    pub fn disregard(&self) -> bool {
        self.disregard
    }

    /// Language of the innermost open embedded block
    pub fn embedded(&self) -> Option<EmbeddedLanguage> {
        self.embedded.last().copied()
    }

    pub fn parse(&mut self, line: &str, ctx: &mut CompilerContext) -> Directive {
        let trimmed = line.trim();
        if !trimmed.starts_with('#') {
            return Directive::None;
        }

        if let Some(directive) = self.parse_embedded(trimmed) {
            return directive;
        }
        if !self.embedded.is_empty() {
            return Directive::None;
        }

        let Some(caps) = static_regex!(r"^#([a-z]\w*)\b\s*(.*)$").captures(trimmed) else {
            return Directive::None;
        };
        let keyword = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let rest = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();

        if self.disregard {
            self.parse_while_disregarding(keyword);
            return Directive::Consumed;
        }

        match keyword {
            "include" => self.parse_include(rest, ctx),
            "define" => {
                self.parse_define(rest, ctx);
                Directive::Consumed
            }
            "undef" => {
                if ctx.aliases.remove(rest).is_none() {
                    debug!("#undef of unknown '{}'", rest);
                }
                Directive::Consumed
            }
            "pragma" => self.parse_pragma(trimmed, rest, ctx),
            "ifdef" => {
                self.disregard = !ctx.aliases.identifier_exists(rest);
                Directive::Consumed
            }
            "ifndef" => {
                self.disregard = ctx.aliases.identifier_exists(rest);
                Directive::Consumed
            }
            "if" => {
                self.disregard = !self.evaluate_condition(rest, ctx);
                Directive::Consumed
            }
            "else" => {
                self.disregard = true;
                Directive::Consumed
            }
            "endif" | "end" => Directive::Consumed,
            _ => {
                debug!("ignoring directive #{}", keyword);
                Directive::Consumed
            }
        }
    }

    fn parse_embedded(&mut self, trimmed: &str) -> Option<Directive> {
        let word = trimmed.split_whitespace().next().unwrap_or_default();
        match word {
            "#PYTHON" => {
                self.embedded.push(EmbeddedLanguage::Python);
                Some(Directive::EmbeddedStart(EmbeddedLanguage::Python))
            }
            "#PPL" => {
                self.embedded.push(EmbeddedLanguage::Ppl);
                Some(Directive::EmbeddedStart(EmbeddedLanguage::Ppl))
            }
            "#END" => Some(match self.embedded.pop() {
                Some(language) => Directive::EmbeddedEnd(language),
                None => {
                    self.parse_while_disregarding("end");
                    Directive::Consumed
                }
            }),
            _ => None,
        }
    }

    fn parse_while_disregarding(&mut self, keyword: &str) {
        match keyword {
            "if" | "ifdef" | "ifndef" => self.skipped_conditionals += 1,
            "else" if self.skipped_conditionals == 0 => self.disregard = false,
            "endif" | "end" => {
                if self.skipped_conditionals == 0 {
                    self.disregard = false;
                } else {
                    self.skipped_conditionals -= 1;
                }
            }
            _ => {}
        }
    }

    fn parse_include(&self, rest: &str, ctx: &mut CompilerContext) -> Directive {
        if let Some(name) = rest.strip_prefix('<').and_then(|r| r.strip_suffix('>')) {
            let mut path = ctx.config.library_path.join(name.trim());
            if path.extension().is_none() {
                path.set_extension(LIBRARY_EXTENSION);
            }
            return Directive::Include(path);
        }

        if let Some(name) = rest.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
            let name = Path::new(name.trim());
            let relative = ctx.current_dir().map(|dir| dir.join(name));
            let path = match relative {
                Some(candidate) if candidate.exists() => candidate,
                _ => name.to_path_buf(),
            };
            return Directive::Include(path);
        }

        ctx.error(format!("malformed #include {rest}"));
        Directive::Consumed
    }

    fn parse_define(&self, rest: &str, ctx: &mut CompilerContext) {
        let Some(caps) = static_regex!(r"^([A-Za-z_]\w*)(?:\(([\w\s,]*)\))?(?:\s+(.*))?$").captures(rest) else {
            ctx.error(format!("malformed #define {rest}"));
            return;
        };

        let name = &caps[1];
        let parameters: Vec<String> = caps
            .get(2)
            .map(|m| {
                m.as_str()
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let body = caps.get(3).map(|m| m.as_str().trim()).unwrap_or_default();

        let location = ctx.location();
        let body = ctx
            .aliases
            .resolve_all_aliases_in_text(body, &mut ctx.diagnostics, &location);
        let body = calc::evaluate_math_expression(&body, &mut ctx.diagnostics, &location);

        let identity = Identity::new(name, body, IdentityKind::Macro)
            .with_parameters(parameters)
            .with_scope(Scope::GLOBAL);
        let site = ctx.site();
        ctx.aliases.append(identity, &site, &mut ctx.diagnostics);
    }

    fn parse_pragma(&self, trimmed: &str, rest: &str, ctx: &mut CompilerContext) -> Directive {
        if rest.starts_with("mode") {
            return Directive::PassThrough(trimmed.to_string());
        }

        let options = rest.trim_start_matches('(').trim_end_matches(')');
        for option in options.split(',').map(str::trim).filter(|o| !o.is_empty()) {
            match option {
                "verbose aliases" => ctx.aliases.verbose = true,
                "quiet aliases" => ctx.aliases.verbose = false,
                _ => debug!("unknown pragma option '{}'", option),
            }
        }
        Directive::Consumed
    }

    /// `#if NAME <op> value`: compares NAME's replacement text with the
    /// value, numerically when both are numbers. An undefined NAME is false.
    fn evaluate_condition(&self, rest: &str, ctx: &mut CompilerContext) -> bool {
        let Some(caps) = static_regex!(r"^([A-Za-z_]\w*)\s*(==|!=|<>|>=|<=|>|<|=)\s*(.+?)$").captures(rest) else {
            ctx.error(format!("malformed #if {rest}"));
            return false;
        };

        let Some(identity) = ctx.aliases.get_identity(&caps[1]) else {
            return false;
        };
        let Some(op) = Comparison::parse(&caps[2]) else {
            return false;
        };

        let left = identity.real.trim();
        let right = caps[3].trim().trim_matches('"');
        match (left.parse::<f64>(), right.parse::<f64>()) {
            (Ok(a), Ok(b)) => op.holds(a, b),
            _ => op.holds(left, right),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PplusConfig;
    use pretty_assertions::assert_eq;

    fn setup() -> (Preprocessor, CompilerContext) {
        let mut ctx = CompilerContext::new(PplusConfig::default());
        ctx.push_source("main.pp");
        (Preprocessor::new(), ctx)
    }

    #[test]
    fn test_plain_lines_are_not_directives() {
        let (mut pre, mut ctx) = setup();
        assert_eq!(pre.parse("x := 1;", &mut ctx), Directive::None);
        assert_eq!(pre.parse("#FFh + 1", &mut ctx), Directive::None);
    }

    #[test]
    fn test_define_folds_body() {
        let (mut pre, mut ctx) = setup();
        assert_eq!(pre.parse("#define SIZE 4 * 8", &mut ctx), Directive::Consumed);
        assert_eq!(pre.parse("#define HALF SIZE / 2", &mut ctx), Directive::Consumed);
        assert_eq!(ctx.aliases.get_identity("SIZE").unwrap().real, "32");
        assert_eq!(ctx.aliases.get_identity("HALF").unwrap().real, "16");
    }

    #[test]
    fn test_define_macro_and_undef() {
        let (mut pre, mut ctx) = setup();
        pre.parse("#define MAX(a, b) IFTE(a > b, a, b)", &mut ctx);
        let identity = ctx.aliases.get_identity("MAX").unwrap();
        assert_eq!(identity.parameters, vec!["a", "b"]);
        assert_eq!(identity.kind, IdentityKind::Macro);

        pre.parse("#undef MAX", &mut ctx);
        assert!(!ctx.aliases.identifier_exists("MAX"));
    }

    #[test]
    fn test_macro_parameters_may_contain_digits() {
        let (mut pre, mut ctx) = setup();
        assert_eq!(pre.parse("#define TWICE(x1, y_2) x1*2+y_2", &mut ctx), Directive::Consumed);
        let identity = ctx.aliases.get_identity("TWICE").unwrap();
        assert_eq!(identity.parameters, vec!["x1", "y_2"]);
        assert_eq!(identity.kind, IdentityKind::Macro);
        assert!(!ctx.diagnostics.has_errors());
    }

    #[test]
    fn test_ifdef_gating() {
        let (mut pre, mut ctx) = setup();
        pre.parse("#define DEBUG", &mut ctx);

        pre.parse("#ifdef DEBUG", &mut ctx);
        assert!(!pre.disregard());
        pre.parse("#else", &mut ctx);
        assert!(pre.disregard());
        pre.parse("#endif", &mut ctx);
        assert!(!pre.disregard());

        pre.parse("#ifndef DEBUG", &mut ctx);
        assert!(pre.disregard());
        pre.parse("#else", &mut ctx);
        assert!(!pre.disregard());
        pre.parse("#endif", &mut ctx);
        assert!(!pre.disregard());
    }

    #[test]
    fn test_skipped_region_ignores_inner_conditionals() {
        let (mut pre, mut ctx) = setup();
        pre.parse("#ifdef MISSING", &mut ctx);
        pre.parse("#define INNER 1", &mut ctx);
        pre.parse("#ifdef ANYTHING", &mut ctx);
        pre.parse("#endif", &mut ctx);
        assert!(pre.disregard());
        pre.parse("#endif", &mut ctx);
        assert!(!pre.disregard());
        assert!(!ctx.aliases.identifier_exists("INNER"));
    }

    #[test]
    fn test_if_comparison() {
        let (mut pre, mut ctx) = setup();
        pre.parse("#define LEVEL 3", &mut ctx);
        pre.parse("#define NAME beta", &mut ctx);

        pre.parse("#if LEVEL >= 2", &mut ctx);
        assert!(!pre.disregard());
        pre.parse("#endif", &mut ctx);

        pre.parse("#if LEVEL > 10", &mut ctx);
        assert!(pre.disregard());
        pre.parse("#endif", &mut ctx);

        pre.parse("#if NAME == beta", &mut ctx);
        assert!(!pre.disregard());
        pre.parse("#endif", &mut ctx);

        pre.parse("#if UNDEFINED == 1", &mut ctx);
        assert!(pre.disregard());
        pre.parse("#endif", &mut ctx);
    }

    #[test]
    fn test_include_forms() {
        let (mut pre, mut ctx) = setup();
        ctx.config.library_path = PathBuf::from("/lib/pplus");
        assert_eq!(
            pre.parse("#include <hp>", &mut ctx),
            Directive::Include(PathBuf::from("/lib/pplus/hp.pplib"))
        );
        assert_eq!(
            pre.parse("#include \"util.pp\"", &mut ctx),
            Directive::Include(PathBuf::from("util.pp"))
        );
    }

    #[test]
    fn test_embedded_blocks() {
        let (mut pre, mut ctx) = setup();
        assert_eq!(
            pre.parse("#PYTHON (a)", &mut ctx),
            Directive::EmbeddedStart(EmbeddedLanguage::Python)
        );
        assert_eq!(pre.embedded(), Some(EmbeddedLanguage::Python));
        assert_eq!(pre.parse("#define X 1", &mut ctx), Directive::None);
        assert_eq!(
            pre.parse("#END", &mut ctx),
            Directive::EmbeddedEnd(EmbeddedLanguage::Python)
        );
        assert_eq!(pre.embedded(), None);
        assert!(!ctx.aliases.identifier_exists("X"));
    }

    #[test]
    fn test_pragma() {
        let (mut pre, mut ctx) = setup();
        let line = "#pragma mode( separator(.,;) integer(h64) )";
        assert_eq!(pre.parse(line, &mut ctx), Directive::PassThrough(line.to_string()));
        assert_eq!(pre.parse("#pragma (verbose aliases)", &mut ctx), Directive::Consumed);
        assert!(ctx.aliases.verbose);
    }

    #[test]
    fn test_uppercase_end_closes_conditional() {
        let (mut pre, mut ctx) = setup();
        pre.parse("#ifdef MISSING", &mut ctx);
        assert_eq!(pre.parse("#END", &mut ctx), Directive::Consumed);
        assert!(!pre.disregard());
    }

    #[test]
    fn test_unknown_directive_is_consumed() {
        let (mut pre, mut ctx) = setup();
        assert_eq!(pre.parse("#warning nothing", &mut ctx), Directive::Consumed);
        assert!(ctx.diagnostics.is_empty());
    }
}
