/*!
# Pattern Rules

User-declared substitutions:

```text
regex [@][<op> <n>] `pattern`[i] replacement
regex word replacement
```

A rule applies only when its scope gate holds for the current nesting
depth, and it is discarded once the depth drops below the level it was
declared at. A plain rule fires only at the depth it was declared at; an
`@` rule is declared at file level and fires at every depth unless it
names its own `<op> <n>` gate. Replacements may refer to
capture groups (`$1`), to `__SCOPE__` (the current depth) and to inline
`` \`expr\` `` calculations.
*/

use regex::Regex;
use tracing::debug;

use crate::calc;
use crate::context::Site;
use crate::diagnostics::{Diagnostics, SourceLocation};
use crate::error::PplusError;
use crate::pattern::MatchPattern;

/// Comparison used by a scope gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Less,
    LessEqual,
    Equal,
    NotEqual,
    GreaterEqual,
    Greater,
}

impl Comparison {
    pub fn parse(op: &str) -> Option<Self> {
        Some(match op {
            "<" => Self::Less,
            "<=" | "≤" => Self::LessEqual,
            "==" | "=" => Self::Equal,
            "!=" | "≠" | "<>" => Self::NotEqual,
            ">=" | "≥" => Self::GreaterEqual,
            ">" => Self::Greater,
            _ => return None,
        })
    }

    pub fn holds<T: PartialOrd>(self, left: T, right: T) -> bool {
        match self {
            Self::Less => left < right,
            Self::LessEqual => left <= right,
            Self::Equal => left == right,
            Self::NotEqual => left != right,
            Self::GreaterEqual => left >= right,
            Self::Greater => left > right,
        }
    }
}

/// When a rule is allowed to fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeGate {
    /// At every depth
    Any,
    /// Only at exactly this depth
    Exact(usize),
    /// When `depth <op> n` holds
    Compare(Comparison, usize),
}

impl ScopeGate {
    pub fn admits(self, depth: usize) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(level) => depth == level,
            Self::Compare(op, level) => op.holds(depth, level),
        }
    }
}

/// One declared rule
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub pattern: MatchPattern,
    pub replacement: String,
    pub case_insensitive: bool,
    /// Depth the rule was declared at; it is dropped below this depth
    pub scope_level: usize,
    pub gate: ScopeGate,
    pub location: SourceLocation,
    matcher: Regex,
}

impl PatternRule {
    pub fn new(
        pattern: MatchPattern,
        replacement: impl Into<String>,
        case_insensitive: bool,
        scope_level: usize,
        gate: ScopeGate,
    ) -> Result<Self, PplusError> {
        let matcher = pattern.compile(case_insensitive)?;

        Ok(Self {
            pattern,
            replacement: replacement.into(),
            case_insensitive,
            scope_level,
            gate,
            location: SourceLocation::default(),
            matcher,
        })
    }

    /// Apply the rule to `line` at `depth`, returning the rewritten line
    /// when the rule fired
    fn apply(&self, line: &str, depth: usize) -> Option<String> {
        if !self.gate.admits(depth) || !self.matcher.is_match(line) {
            return None;
        }
        let replacement = self.replacement.replace("__SCOPE__", &depth.to_string());
        Some(self.matcher.replace_all(line, replacement.as_str()).into_owned())
    }
}

fn declaration_regex() -> &'static Regex {
    static_regex!(
        r"^\s*regex\s+(@\s*)?(?:(<=|>=|==|!=|<>|≤|≥|≠|<|>|=)\s*(\d+)\s+)?(`(?:[^`\\]|\\.)*`|[^\s`]+)(i)?(?:\s+(.*?))?\s*$"
    )
}

/// The set of active pattern rules
#[derive(Debug, Clone)]
pub struct Regexps {
    rules: Vec<PatternRule>,
    max_passes: usize,
}

impl Default for Regexps {
    fn default() -> Self {
        Self::new(32)
    }
}

impl Regexps {
    pub fn new(max_passes: usize) -> Self {
        Self {
            rules: Vec::new(),
            max_passes: max_passes.max(1),
        }
    }

    /// Recognize and register a `regex` declaration.
    ///
    /// Returns true when `line` was a declaration (even a rejected one) and
    /// must not be emitted.
    pub fn parse(&mut self, line: &str, site: &Site, diagnostics: &mut Diagnostics) -> bool {
        let Some(caps) = declaration_regex().captures(line) else {
            return false;
        };

        let global = caps.get(1).is_some();
        let scope_level = if global { 0 } else { site.depth };
        let default_gate = if global {
            ScopeGate::Any
        } else {
            ScopeGate::Exact(scope_level)
        };
        let gate = match (caps.get(2), caps.get(3)) {
            (Some(op), Some(n)) => match (Comparison::parse(op.as_str()), n.as_str().parse()) {
                (Some(op), Ok(n)) => ScopeGate::Compare(op, n),
                _ => default_gate,
            },
            _ => default_gate,
        };

        let pattern = MatchPattern::parse(&caps[4]);
        let case_insensitive = caps.get(5).is_some();
        let replacement = caps.get(6).map(|m| m.as_str()).unwrap_or_default();

        if let Some(prior) = self.rules.iter().find(|r| r.pattern == pattern) {
            diagnostics.warning(
                site.location.clone(),
                format!(
                    "redefinition of regex `{}`, previous definition at {}",
                    pattern.as_str(),
                    prior.location
                ),
            );
            return true;
        }

        match PatternRule::new(pattern, replacement, case_insensitive, scope_level, gate) {
            Ok(mut rule) => {
                rule.location = site.location.clone();
                debug!(
                    "regex `{}` defined at level {} ({:?})",
                    rule.pattern.as_str(),
                    scope_level,
                    gate
                );
                self.rules.push(rule);
            }
            Err(e) => diagnostics.error(site.location.clone(), e.to_string()),
        }
        true
    }

    /// Drop rules declared deeper than `depth`, returning how many were dropped
    pub fn remove_all_out_of_scope_regexps(&mut self, depth: usize) -> usize {
        let before = self.rules.len();
        self.rules.retain(|r| r.scope_level <= depth);
        before - self.rules.len()
    }

    /// Apply the rules to `line` until a pass changes nothing.
    ///
    /// Each pass tries every admitted rule in declaration order, each one on
    /// the output of the rule before it.
    pub fn resolve_all_regular_expressions(
        &self,
        line: &str,
        depth: usize,
        diagnostics: &mut Diagnostics,
        location: &SourceLocation,
    ) -> String {
        if self.rules.is_empty() {
            return line.to_string();
        }

        let mut current = line.to_string();
        for _ in 0..self.max_passes {
            let mut next = current.clone();
            for rule in &self.rules {
                if let Some(rewritten) = rule.apply(&next, depth) {
                    next = calc::fold_inline_expressions(&rewritten, diagnostics, location);
                }
            }
            if next == current {
                return current;
            }
            current = next;
        }

        diagnostics.error(
            location.clone(),
            PplusError::substitution_loop(line, self.max_passes).to_string(),
        );
        current
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatternRule> {
        self.rules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn declare(rules: &mut Regexps, line: &str, depth: usize) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        assert!(rules.parse(line, &Site::new(SourceLocation::new("t.pp", 1), depth), &mut diagnostics));
        diagnostics
    }

    fn resolve(rules: &Regexps, line: &str, depth: usize) -> String {
        let mut diagnostics = Diagnostics::new();
        rules.resolve_all_regular_expressions(line, depth, &mut diagnostics, &SourceLocation::default())
    }

    #[test]
    fn test_not_a_declaration() {
        let mut rules = Regexps::default();
        let mut diagnostics = Diagnostics::new();
        assert!(!rules.parse("x := regex;", &Site::default(), &mut diagnostics));
        assert!(!rules.parse("regexp := 1;", &Site::default(), &mut diagnostics));
    }

    #[test]
    fn test_word_rule() {
        let mut rules = Regexps::default();
        declare(&mut rules, "regex @ nil 0", 0);
        assert_eq!(resolve(&rules, "x := nil; nils := 2;", 0), "x := 0; nils := 2;");
    }

    #[test]
    fn test_capture_groups_and_case() {
        let mut rules = Regexps::default();
        declare(&mut rules, r"regex @ `\bsquare\((\w+)\)`i ($1*$1)", 0);
        assert_eq!(resolve(&rules, "y := SQUARE(a);", 0), "y := (a*a);");
    }

    #[test]
    fn test_scope_gate_exact() {
        let mut rules = Regexps::default();
        declare(&mut rules, "regex `\\bret\\b` RETURN", 1);
        assert_eq!(resolve(&rules, "ret;", 1), "RETURN;");
        assert_eq!(resolve(&rules, "ret;", 2), "ret;");
    }

    #[test]
    fn test_global_rule_fires_in_blocks() {
        let mut rules = Regexps::default();
        declare(&mut rules, r"regex @ `\bsquare\((\w+)\)` ($1*$1)", 0);
        assert_eq!(rules.iter().next().map(|r| r.gate), Some(ScopeGate::Any));
        assert_eq!(resolve(&rules, "y := square(a);", 0), "y := (a*a);");
        assert_eq!(resolve(&rules, "y := square(a);", 3), "y := (a*a);");
    }

    #[test]
    fn test_every_rule_is_tried_in_order() {
        let mut rules = Regexps::default();
        declare(&mut rules, r"regex @ `\bFOO\b` FOO", 0);
        declare(&mut rules, r"regex @ `\bbar\b` BAZ", 0);
        declare(&mut rules, r"regex @ `\bBAZ\b` QUX", 0);
        assert_eq!(resolve(&rules, "x := FOO + bar;", 0), "x := FOO + QUX;");
    }

    #[test]
    fn test_scope_gate_comparison() {
        let mut rules = Regexps::default();
        declare(&mut rules, "regex @ >= 2 `\\bdeep\\b` DEEP", 0);
        assert_eq!(resolve(&rules, "deep", 1), "deep");
        assert_eq!(resolve(&rules, "deep", 3), "DEEP");
    }

    #[test]
    fn test_scope_substitution_and_folding() {
        let mut rules = Regexps::default();
        declare(&mut rules, "regex @ >= 0 `\\blevel\\b` \\`__SCOPE__*10`", 0);
        assert_eq!(resolve(&rules, "x := level;", 2), "x := 20;");
    }

    #[test]
    fn test_out_of_scope_rules_are_dropped() {
        let mut rules = Regexps::default();
        declare(&mut rules, "regex `a` b", 2);
        declare(&mut rules, "regex @ `c` d", 2);
        assert_eq!(rules.remove_all_out_of_scope_regexps(1), 1);
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn test_duplicate_rule_warns() {
        let mut rules = Regexps::default();
        declare(&mut rules, "regex @ `x` y", 0);
        let diagnostics = declare(&mut rules, "regex @ `x` z", 0);
        assert_eq!(diagnostics.count(crate::Severity::Warning), 1);
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let mut rules = Regexps::default();
        let diagnostics = declare(&mut rules, "regex @ `(` y", 0);
        assert!(diagnostics.has_errors());
        assert!(rules.is_empty());
    }

    #[test]
    fn test_runaway_rule_is_bounded() {
        let mut rules = Regexps::new(4);
        declare(&mut rules, "regex @ `a` aa", 0);
        let mut diagnostics = Diagnostics::new();
        let out = rules.resolve_all_regular_expressions("a", 0, &mut diagnostics, &SourceLocation::default());
        assert_eq!(out, "a".repeat(16));
        assert!(diagnostics.has_errors());
    }
}
