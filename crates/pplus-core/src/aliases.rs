/*!
# Alias Table

Scoped symbol table mapping P+ identifiers to the PPL text that replaces
them. Entries are kept sorted by identifier length, longest first, so that
`pt.x` is substituted before `pt` ever gets a chance to match inside it.

Macro identities carry parameters; a call `NAME(a, b)` has its arguments
resolved first and then substituted into the body. Substitution repeats
until the text stops changing, bounded by the configured pass limit.
*/

use std::collections::HashMap;
use std::fmt;

use regex::{Captures, NoExpand, Regex};
use tracing::{debug, info};

use crate::context::Site;
use crate::diagnostics::{Diagnostics, SourceLocation};
use crate::error::PplusError;
use crate::pattern::{is_word_char, MatchPattern};
use crate::strings::ProtectedStrings;

/// What kind of declaration produced an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum IdentityKind {
    #[default]
    Unknown,
    Macro,
    Alias,
    Function,
    Argument,
    Variable,
    Enumerator,
    Struct,
    Member,
    Def,
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdentityKind::Unknown => "identifier",
            IdentityKind::Macro => "macro",
            IdentityKind::Alias => "alias",
            IdentityKind::Function => "function",
            IdentityKind::Argument => "argument",
            IdentityKind::Variable => "variable",
            IdentityKind::Enumerator => "enumerator",
            IdentityKind::Struct => "structure",
            IdentityKind::Member => "member",
            IdentityKind::Def => "def",
        };
        f.write_str(name)
    }
}

/// Lifetime of an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Scope {
    /// Take the nesting depth at the point of declaration
    #[default]
    Auto,
    /// Live until the nesting depth drops below this level
    Level(usize),
}

impl Scope {
    pub const GLOBAL: Scope = Scope::Level(0);
}

/// One entry of the alias table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub identifier: String,
    pub real: String,
    pub parameters: Vec<String>,
    pub kind: IdentityKind,
    pub scope: Scope,
    pub location: SourceLocation,
    pub deprecated: bool,
    pub message: String,
}

impl Identity {
    pub fn new(identifier: impl Into<String>, real: impl Into<String>, kind: IdentityKind) -> Self {
        Self {
            identifier: identifier.into(),
            real: real.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<String>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn deprecated(mut self, message: impl Into<String>) -> Self {
        self.deprecated = true;
        self.message = message.into();
        self
    }

    /// Identities with parameters are expanded as calls, not plain words
    pub fn is_macro_call(&self) -> bool {
        !self.parameters.is_empty()
    }

    fn level(&self) -> usize {
        match self.scope {
            Scope::Level(level) => level,
            Scope::Auto => 0,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    identity: Identity,
    matcher: Regex,
}

impl Entry {
    fn compile(identity: Identity, namespaces: &[String]) -> Result<Self, PplusError> {
        let pattern = MatchPattern::parse(&identity.identifier);
        let matcher = if identity.is_macro_call() {
            let name = pattern.source_with_namespaces(namespaces);
            Regex::new(&format!(r"{name}\s*\("))
        } else {
            Regex::new(&pattern.source_with_namespaces(namespaces))
        }
        .map_err(|source| PplusError::InvalidPattern {
            pattern: identity.identifier.clone(),
            source,
        })?;

        Ok(Self { identity, matcher })
    }
}

/// The scoped alias table
#[derive(Debug, Clone)]
pub struct Aliases {
    entries: Vec<Entry>,
    namespaces: Vec<(String, usize)>,
    max_passes: usize,
    /// Log every definition at info level instead of debug
    pub verbose: bool,
}

impl Default for Aliases {
    fn default() -> Self {
        Self::new(32)
    }
}

impl Aliases {
    pub fn new(max_passes: usize) -> Self {
        Self {
            entries: Vec::new(),
            namespaces: Vec::new(),
            max_passes: max_passes.max(1),
            verbose: false,
        }
    }

    /// Add an identity to the table.
    ///
    /// Returns false when the identifier is empty, already defined (a warning
    /// naming the earlier definition is reported) or its pattern is invalid.
    pub fn append(&mut self, identity: Identity, site: &Site, diagnostics: &mut Diagnostics) -> bool {
        let mut identity = identity;
        identity.identifier = identity.identifier.trim().to_string();
        identity.real = identity.real.trim().to_string();
        identity.message = identity.message.trim().to_string();
        if identity.identifier.is_empty() {
            return false;
        }

        identity.location = site.location.clone();
        if identity.scope == Scope::Auto {
            identity.scope = Scope::Level(site.depth);
        }

        if identity.identifier.starts_with('_') && !identity.identifier.starts_with("__") {
            identity.identifier.remove(0);
            identity.kind = IdentityKind::Member;
        }

        if let Some(prior) = self.get_identity(&identity.identifier) {
            let message = format!(
                "redefinition of {} '{}', previous definition at {}",
                identity.kind, identity.identifier, prior.location
            );
            diagnostics.warning(site.location.clone(), message);
            return false;
        }

        let names = self.namespace_names();
        let entry = match Entry::compile(identity, &names) {
            Ok(entry) => entry,
            Err(e) => {
                diagnostics.error(site.location.clone(), e.to_string());
                return false;
            }
        };

        self.log_definition(&entry.identity);
        self.entries.push(entry);
        self.entries.sort_by(|a, b| {
            b.identity
                .identifier
                .chars()
                .count()
                .cmp(&a.identity.identifier.chars().count())
        });
        true
    }

    fn log_definition(&self, identity: &Identity) {
        if self.verbose {
            info!(
                "{} '{}' for '{}' defined",
                identity.kind, identity.identifier, identity.real
            );
        } else {
            debug!(
                "{} '{}' for '{}' defined at level {}",
                identity.kind,
                identity.identifier,
                identity.real,
                identity.level()
            );
        }
    }

    /// Remove an identity by identifier
    pub fn remove(&mut self, identifier: &str) -> Option<Identity> {
        let index = self
            .entries
            .iter()
            .position(|e| e.identity.identifier == identifier)?;
        let entry = self.entries.remove(index);
        debug!("{} '{}' removed", entry.identity.kind, identifier);
        Some(entry.identity)
    }

    /// Drop every identity whose scope is deeper than `depth`.
    ///
    /// Namespaces opened deeper than `depth` are closed as well. Returns the
    /// number of identities removed.
    pub fn remove_all_out_of_scope_aliases(&mut self, depth: usize) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.identity.level() <= depth);

        let namespaces = self.namespaces.len();
        self.namespaces.retain(|(_, level)| *level <= depth);
        if namespaces != self.namespaces.len() {
            self.recompile();
        }

        before - self.entries.len()
    }

    /// Drop every identity of the given kind
    pub fn remove_all_aliases_of_kind(&mut self, kind: IdentityKind) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.identity.kind != kind);
        before - self.entries.len()
    }

    pub fn identifier_exists(&self, identifier: &str) -> bool {
        self.get_identity(identifier).is_some()
    }

    pub fn real_exists(&self, real: &str) -> bool {
        self.entries.iter().any(|e| e.identity.real == real)
    }

    pub fn get_identity(&self, identifier: &str) -> Option<&Identity> {
        self.entries
            .iter()
            .map(|e| &e.identity)
            .find(|i| i.identifier == identifier)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.entries.iter().map(|e| &e.identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Make `name::x` reachable as plain `x` until the depth drops below `depth`
    pub fn add_namespace(&mut self, name: &str, depth: usize) {
        let name = name.trim();
        if name.is_empty() || self.namespaces.iter().any(|(n, _)| n == name) {
            return;
        }
        self.namespaces.push((name.to_string(), depth));
        self.recompile();
    }

    pub fn remove_namespace(&mut self, name: &str) {
        let before = self.namespaces.len();
        self.namespaces.retain(|(n, _)| n != name.trim());
        if before != self.namespaces.len() {
            self.recompile();
        }
    }

    pub fn namespace_names(&self) -> Vec<String> {
        self.namespaces.iter().map(|(n, _)| n.clone()).collect()
    }

    fn recompile(&mut self) {
        let names = self.namespace_names();
        let entries = std::mem::take(&mut self.entries);
        for entry in entries {
            match Entry::compile(entry.identity.clone(), &names) {
                Ok(compiled) => self.entries.push(compiled),
                Err(_) => self.entries.push(entry),
            }
        }
    }

    /// Substitute every alias and macro call in `text` until nothing changes.
    ///
    /// String literals are left untouched. Hitting the pass limit reports an
    /// error and returns the text as it stood.
    pub fn resolve_all_aliases_in_text(
        &self,
        text: &str,
        diagnostics: &mut Diagnostics,
        location: &SourceLocation,
    ) -> String {
        if text.trim().is_empty() || self.entries.is_empty() {
            return text.to_string();
        }

        let mut strings = ProtectedStrings::new();
        let mut current = strings.protect(text);
        for _ in 0..self.max_passes {
            let next = self.resolve_once(&current, diagnostics, location);
            if next == current {
                return strings.restore(&next);
            }
            current = next;
        }

        diagnostics.error(
            location.clone(),
            PplusError::substitution_loop(text, self.max_passes).to_string(),
        );
        strings.restore(&current)
    }

    fn resolve_once(&self, text: &str, diagnostics: &mut Diagnostics, location: &SourceLocation) -> String {
        let mut current = text.to_string();
        for entry in &self.entries {
            if !entry.matcher.is_match(&current) {
                continue;
            }

            if entry.identity.is_macro_call() {
                current = self.expand_calls(entry, &current, diagnostics, location);
                continue;
            }

            report_deprecated(&entry.identity, diagnostics, location);
            current = entry
                .matcher
                .replace_all(&current, NoExpand(&entry.identity.real))
                .into_owned();
        }
        current
    }

    fn expand_calls(
        &self,
        entry: &Entry,
        text: &str,
        diagnostics: &mut Diagnostics,
        location: &SourceLocation,
    ) -> String {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;

        while let Some(m) = entry.matcher.find_at(text, cursor) {
            let open = m.end() - 1;
            let Some(close) = matching_paren(text, open) else {
                break;
            };

            let arguments: Vec<String> = split_arguments(&text[open + 1..close])
                .into_iter()
                .map(|arg| self.expand_calls(entry, arg.trim(), diagnostics, location))
                .collect();

            report_deprecated(&entry.identity, diagnostics, location);
            out.push_str(&text[cursor..m.start()]);
            out.push_str(&substitute_parameters(&entry.identity, &arguments, diagnostics, location));
            cursor = close + 1;
        }

        out.push_str(&text[cursor..]);
        out
    }
}

fn report_deprecated(identity: &Identity, diagnostics: &mut Diagnostics, location: &SourceLocation) {
    if !identity.deprecated {
        return;
    }
    let mut message = format!("'{}' is deprecated", identity.identifier);
    if !identity.message.is_empty() {
        message.push_str(": ");
        message.push_str(&identity.message);
    }
    diagnostics.deprecated(location.clone(), message);
}

/// Index of the `)` matching the `(` at `open`
pub fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split a call's argument list at commas outside nested brackets
pub fn split_arguments(text: &str) -> Vec<&str> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut arguments = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                arguments.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    arguments.push(&text[start..]);
    arguments
}

fn substitute_parameters(
    identity: &Identity,
    arguments: &[String],
    diagnostics: &mut Diagnostics,
    location: &SourceLocation,
) -> String {
    if arguments.len() != identity.parameters.len() {
        diagnostics.error(
            location.clone(),
            format!(
                "macro '{}' expects {} argument(s), got {}",
                identity.identifier,
                identity.parameters.len(),
                arguments.len()
            ),
        );
        return identity.real.clone();
    }

    let mut parameters: Vec<(&str, &str)> = identity
        .parameters
        .iter()
        .map(String::as_str)
        .zip(arguments.iter().map(String::as_str))
        .collect();
    parameters.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    // A leading or trailing `_` lets a parameter splice into a longer word.
    let alternatives: Vec<String> = parameters
        .iter()
        .map(|(name, _)| {
            let escaped = regex::escape(name);
            let prefix = if name.starts_with('_') || !name.starts_with(is_word_char) { "" } else { r"\b" };
            let suffix = if name.ends_with('_') || !name.ends_with(is_word_char) { "" } else { r"\b" };
            format!("{prefix}{escaped}{suffix}")
        })
        .collect();

    let Ok(re) = Regex::new(&alternatives.join("|")) else {
        return identity.real.clone();
    };
    let values: HashMap<&str, &str> = parameters.into_iter().collect();
    re.replace_all(&identity.real, |caps: &Captures| {
        let matched = &caps[0];
        values.get(matched).copied().unwrap_or(matched).to_string()
    })
    .into_owned()
}
