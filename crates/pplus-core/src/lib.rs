//! # P+ Core
//!
//! Translation engine of the P+ compiler. P+ is an enhanced dialect of the
//! calculator's PPL language; this crate lowers it to strict PPL:
//! - Scoped alias/macro symbol table
//! - Preprocessor directive interpreter (`#define`, `#ifdef`, `#include`, ...)
//! - User-declared pattern-substitution rules
//! - Compile-time constant expression evaluator
//! - Structural desugarers (structs, enums, switch, C-style for, ternaries, ...)
//! - Line-by-line translator tracking block nesting
//! - Minifier and reformatter post-passes over the generated PPL
//!
//! The command-line front end lives in the `pplus-cli` crate; everything here
//! can be driven programmatically through [`Translator`] or [`compile_str`].

#![warn(clippy::all)]

/// Compile a built-in regex literal once and reuse it
macro_rules! static_regex {
    ($pattern:expr) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($pattern).expect("built-in pattern compiles"))
    }};
}

pub mod aliases;
pub mod calc;
pub mod context;
pub mod desugar;
pub mod diagnostics;
pub mod error;
pub mod nesting;
pub mod output;
pub mod pattern;
pub mod postpass;
pub mod preprocessor;
pub mod regexp;
pub mod strings;
pub mod translator;

use std::path::PathBuf;

// Re-export commonly used types
pub use aliases::{Aliases, Identity, IdentityKind, Scope};
pub use context::{CompilerContext, Site};
pub use diagnostics::{Diagnostic, Diagnostics, Severity, SourceLocation};
pub use error::{CalcError, PplusError};
pub use pattern::MatchPattern;
pub use preprocessor::{Directive, EmbeddedLanguage, Preprocessor};
pub use regexp::{Comparison, PatternRule, Regexps, ScopeGate};
pub use translator::{
    compile_file, compile_str, compile_to_file, CompileSummary, Translation, Translator,
};

/// P+ compiler version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Post-passes and optional behaviour compiled into this build
pub fn features() -> Vec<&'static str> {
    vec!["core", "minify", "reformat", "utf16le"]
}

/// Initialize tracing for the P+ components.
///
/// `directives` are extra `EnvFilter` directives such as
/// `pplus_core::aliases=debug`. Calling this more than once is harmless.
pub fn init_tracing(directives: &[String]) {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in std::iter::once("pplus_core=info").chain(directives.iter().map(String::as_str)) {
        match directive.parse() {
            Ok(parsed) => filter = filter.add_directive(parsed),
            Err(e) => eprintln!("ignoring invalid log directive '{directive}': {e}"),
        }
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .try_init();
}

/// Core P+ compiler configuration
#[derive(Debug, Clone)]
pub struct PplusConfig {
    /// Search path for `#include <...>` libraries
    pub library_path: PathBuf,
    /// Spaces per nesting level in generated PPL
    pub indent_width: usize,
    /// Spaces a tab character expands to in P+ source
    pub tab_width: usize,
    /// Upper bound on fixpoint passes of alias and pattern-rule substitution
    pub max_substitution_passes: usize,
    /// Run the minifier over the generated PPL
    pub minify: bool,
    /// Run the reformatter over the generated PPL
    pub reformat: bool,
    /// Emit the `#pragma mode(...)` preamble before the program
    pub pragma_preamble: bool,
}

impl Default for PplusConfig {
    fn default() -> Self {
        Self {
            library_path: PathBuf::from("/Applications/HP/PrimeSDK/pplib"),
            indent_width: 2,
            tab_width: 4,
            max_substitution_passes: 32,
            minify: false,
            reformat: false,
            pragma_preamble: false,
        }
    }
}

/// Result type for P+ core operations
pub type Result<T> = std::result::Result<T, PplusError>;
