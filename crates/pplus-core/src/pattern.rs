//! Match patterns shared by aliases and pattern rules.

use regex::{Regex, RegexBuilder};

use crate::error::PplusError;

/// What an alias or pattern rule matches against
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatchPattern {
    /// Literal identifier text, matched as a whole word
    Identifier(String),
    /// Backtick-quoted regular expression, used exactly as written
    Verbatim(String),
}

impl MatchPattern {
    /// Parse a declared pattern: `` `regex` `` is verbatim, anything else an identifier
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match text.strip_prefix('`').and_then(|t| t.strip_suffix('`')) {
            Some(inner) if text.len() >= 2 => Self::Verbatim(inner.to_string()),
            _ => Self::Identifier(text.to_string()),
        }
    }

    /// The text as declared, without backticks
    pub fn as_str(&self) -> &str {
        match self {
            Self::Identifier(s) | Self::Verbatim(s) => s,
        }
    }

    pub fn is_verbatim(&self) -> bool {
        matches!(self, Self::Verbatim(_))
    }

    /// Regex source for this pattern
    pub fn source(&self) -> String {
        match self {
            Self::Identifier(name) => word_bounded(name, &regex::escape(name)),
            Self::Verbatim(pattern) => pattern.clone(),
        }
    }

    /// Regex source that also accepts the identifier qualified by one of
    /// the active `namespaces` (`ns::name`).
    pub fn source_with_namespaces(&self, namespaces: &[String]) -> String {
        let Self::Identifier(name) = self else {
            return self.source();
        };
        if namespaces.is_empty() {
            return self.source();
        }

        let mut base = name.as_str();
        for ns in namespaces {
            if let Some(stripped) = base.strip_prefix(ns.as_str()).and_then(|s| s.strip_prefix("::")) {
                base = stripped;
                break;
            }
        }

        let qualifiers = namespaces
            .iter()
            .map(|ns| regex::escape(ns))
            .collect::<Vec<_>>()
            .join("|");
        let escaped = regex::escape(base);
        let prefix = if base.starts_with(is_word_char) { r"\b" } else { "" };
        let suffix = if base.ends_with(is_word_char) { r"\b" } else { "" };
        format!(r"{prefix}(?:(?:{qualifiers})::)?{escaped}{suffix}")
    }

    pub fn compile(&self, case_insensitive: bool) -> Result<Regex, PplusError> {
        build(&self.source(), case_insensitive)
    }
}

fn build(source: &str, case_insensitive: bool) -> Result<Regex, PplusError> {
    RegexBuilder::new(source)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|source_err| PplusError::InvalidPattern {
            pattern: source.to_string(),
            source: source_err,
        })
}

pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Wrap an escaped pattern in `\b` on each side where the raw text begins or
/// ends with a word character.
pub fn word_bounded(raw: &str, escaped: &str) -> String {
    let prefix = if raw.starts_with(is_word_char) { r"\b" } else { "" };
    let suffix = if raw.ends_with(is_word_char) { r"\b" } else { "" };
    format!("{prefix}{escaped}{suffix}")
}

/// True for a plain PPL identifier: a letter followed by letters, digits or `_`
pub fn is_plain_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic())
        && chars.all(is_word_char)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(MatchPattern::parse("count"), MatchPattern::Identifier("count".into()));
        assert_eq!(MatchPattern::parse("`\\d+`"), MatchPattern::Verbatim("\\d+".into()));
        assert_eq!(MatchPattern::parse("`"), MatchPattern::Identifier("`".into()));
    }

    #[test]
    fn test_identifier_matches_whole_words() {
        let re = MatchPattern::parse("foo").compile(false).unwrap();
        assert!(re.is_match("x := foo + 1"));
        assert!(!re.is_match("foobar"));
        assert!(!re.is_match("my_foo"));
    }

    #[test]
    fn test_dotted_identifier() {
        let re = MatchPattern::parse("pt.x").compile(false).unwrap();
        assert!(re.is_match("pt.x := 1"));
        assert!(!re.is_match("ptax := 1"));
    }

    #[test]
    fn test_namespaced_identifier() {
        let namespaces = vec!["Color".to_string()];
        let pattern = MatchPattern::parse("Color::red");
        let re = Regex::new(&pattern.source_with_namespaces(&namespaces)).unwrap();
        assert!(re.is_match("c := red"));
        assert!(re.is_match("c := Color::red"));

        let re = pattern.compile(false).unwrap();
        assert!(!re.is_match("c := red"));
    }

    #[test]
    fn test_invalid_verbatim_pattern() {
        let err = MatchPattern::parse("`(`").compile(false).unwrap_err();
        assert!(matches!(err, PplusError::InvalidPattern { .. }));
    }

    #[test]
    fn test_plain_identifier() {
        assert!(is_plain_identifier("total2"));
        assert!(!is_plain_identifier("2total"));
        assert!(!is_plain_identifier("pt.x"));
        assert!(!is_plain_identifier("a::b"));
    }
}
