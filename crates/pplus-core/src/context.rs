/*!
# Compiler Context

State shared by every stage of one compilation: configuration, the alias
table, the pattern rules, the diagnostics sink, the current block nesting
depth and the stack of source files being read.
*/

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::aliases::Aliases;
use crate::diagnostics::{Diagnostics, Severity, SourceLocation};
use crate::regexp::Regexps;
use crate::PplusConfig;

/// Where a declaration happened: the source position and the nesting depth
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Site {
    pub location: SourceLocation,
    pub depth: usize,
}

impl Site {
    pub fn new(location: SourceLocation, depth: usize) -> Self {
        Self { location, depth }
    }
}

#[derive(Debug, Clone)]
struct SourceFrame {
    path: PathBuf,
    line: usize,
}

/// Context for one compilation run
#[derive(Debug)]
pub struct CompilerContext {
    pub config: PplusConfig,
    pub aliases: Aliases,
    pub regexps: Regexps,
    pub diagnostics: Diagnostics,
    depth: usize,
    sources: Vec<SourceFrame>,
}

impl CompilerContext {
    pub fn new(config: PplusConfig) -> Self {
        let passes = config.max_substitution_passes;
        Self {
            config,
            aliases: Aliases::new(passes),
            regexps: Regexps::new(passes),
            diagnostics: Diagnostics::new(),
            depth: 0,
            sources: Vec::new(),
        }
    }

    /// Current block nesting depth, 0 is file level
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn increase_depth(&mut self) {
        self.depth += 1;
    }

    /// Leave one block. Aliases and pattern rules declared deeper than the
    /// new depth are purged. Returns false (and reports an error) when there
    /// is no block to leave.
    pub fn decrease_depth(&mut self) -> bool {
        if self.depth == 0 {
            self.error("unexpected END");
            return false;
        }

        self.depth -= 1;
        let aliases = self.aliases.remove_all_out_of_scope_aliases(self.depth);
        let rules = self.regexps.remove_all_out_of_scope_regexps(self.depth);
        if aliases + rules > 0 {
            debug!(
                "depth {}: purged {} aliases and {} pattern rules",
                self.depth, aliases, rules
            );
        }
        true
    }

    /// Start reading a source file
    pub fn push_source(&mut self, path: impl Into<PathBuf>) {
        self.sources.push(SourceFrame {
            path: path.into(),
            line: 0,
        });
    }

    /// Finish reading the current source file
    pub fn pop_source(&mut self) {
        self.sources.pop();
    }

    /// Advance the line counter of the file being read
    pub fn next_line(&mut self) {
        if let Some(frame) = self.sources.last_mut() {
            frame.line += 1;
        }
    }

    pub fn current_source(&self) -> Option<&Path> {
        self.sources.last().map(|frame| frame.path.as_path())
    }

    /// Directory of the file being read, used to resolve quoted includes
    pub fn current_dir(&self) -> Option<&Path> {
        self.current_source().and_then(Path::parent)
    }

    /// True when `path` is already on the include stack
    pub fn is_reading(&self, path: &Path) -> bool {
        self.sources.iter().any(|frame| same_file(&frame.path, path))
    }

    pub fn include_depth(&self) -> usize {
        self.sources.len()
    }

    pub fn location(&self) -> SourceLocation {
        self.sources
            .last()
            .map(|frame| SourceLocation::new(frame.path.clone(), frame.line))
            .unwrap_or_default()
    }

    pub fn site(&self) -> Site {
        Site::new(self.location(), self.depth)
    }

    pub fn report(&mut self, severity: Severity, message: impl Into<String>) {
        let location = self.location();
        self.diagnostics.report(severity, location, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.report(Severity::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.report(Severity::Error, message);
    }

    pub fn critical(&mut self, message: impl Into<String>) {
        self.report(Severity::Critical, message);
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aliases::{Identity, IdentityKind, Scope};

    #[test]
    fn test_depth_tracking() {
        let mut ctx = CompilerContext::new(PplusConfig::default());
        ctx.increase_depth();
        ctx.increase_depth();
        assert_eq!(ctx.depth(), 2);
        assert!(ctx.decrease_depth());
        assert!(ctx.decrease_depth());
        assert!(!ctx.decrease_depth());
        assert_eq!(ctx.depth(), 0);
        assert!(ctx.diagnostics.has_errors());
    }

    #[test]
    fn test_leaving_block_purges_its_aliases() {
        let mut ctx = CompilerContext::new(PplusConfig::default());
        ctx.increase_depth();
        let site = ctx.site();
        let identity = Identity::new("total", "v1", IdentityKind::Variable);
        assert!(ctx.aliases.append(identity, &site, &mut ctx.diagnostics));
        let global = Identity::new("limit", "L1", IdentityKind::Alias).with_scope(Scope::Level(0));
        assert!(ctx.aliases.append(global, &site, &mut ctx.diagnostics));

        ctx.decrease_depth();
        assert!(!ctx.aliases.identifier_exists("total"));
        assert!(ctx.aliases.identifier_exists("limit"));
    }

    #[test]
    fn test_location_follows_source_stack() {
        let mut ctx = CompilerContext::new(PplusConfig::default());
        ctx.push_source("main.pp");
        ctx.next_line();
        ctx.push_source("lib/util.pplib");
        ctx.next_line();
        ctx.next_line();
        assert_eq!(ctx.location().to_string(), "lib/util.pplib:2");
        assert!(ctx.is_reading(Path::new("main.pp")));
        ctx.pop_source();
        assert_eq!(ctx.location().to_string(), "main.pp:1");
        assert_eq!(ctx.current_dir(), Some(Path::new("")));
    }
}
