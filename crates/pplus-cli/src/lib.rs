//! Command-line front end of the P+ compiler.
//!
//! `pplus <input> [-o <output>] [-v <flags>] [-l <library-path>]`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use pplus_core::{compile_to_file, CompileSummary, PplusConfig};
use tracing::{error, info};

/// Extension of generated program files
pub const PROGRAM_EXTENSION: &str = "prgm";

/// Verbose flag letters and the modules they trace
const VERBOSE_TARGETS: &[(char, &str)] = &[
    ('a', "pplus_core::aliases"),
    ('p', "pplus_core::preprocessor"),
    ('r', "pplus_core::regexp"),
    ('l', "pplus_core::calc"),
    ('s', "pplus_core::desugar"),
];

/// Everything a compile run needs from the command line
#[derive(Debug, Clone)]
pub struct CliOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub log_directives: Vec<String>,
    pub config: PplusConfig,
}

pub fn build_command() -> Command {
    Command::new("pplus")
        .version(pplus_core::VERSION)
        .about("Translates P+ source into PPL for the HP Prime")
        .arg(
            Arg::new("input")
                .value_name("FILE")
                .help("P+ source file")
                .required_unless_present("build")
                .index(1),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output program file (defaults to the input name with .prgm)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .value_name("FLAGS")
                .help("Trace (a)liases, (p)reprocessor, (r)egex rules, ca(l)c, (s)ugar; '-' for all"),
        )
        .arg(
            Arg::new("library")
                .short('l')
                .long("lib")
                .value_name("PATH")
                .help("Search path for #include <...> libraries"),
        )
        .arg(
            Arg::new("minify")
                .long("minify")
                .help("Minify the generated program")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("reformat")
                .long("reformat")
                .help("Reformat the generated program")
                .conflicts_with("minify")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("pragma")
                .long("pragma")
                .help("Start the program with the #pragma mode preamble")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("build")
                .long("build")
                .help("Print build information and exit")
                .action(ArgAction::SetTrue),
        )
}

/// Turn parsed arguments into options, `None` when there is nothing to compile
pub fn options_from_matches(matches: &ArgMatches) -> Option<CliOptions> {
    let input = PathBuf::from(matches.get_one::<String>("input")?);
    let output = matches
        .get_one::<String>("output")
        .map(PathBuf::from)
        .unwrap_or_else(|| default_output(&input));

    let mut config = PplusConfig {
        minify: matches.get_flag("minify"),
        reformat: matches.get_flag("reformat"),
        pragma_preamble: matches.get_flag("pragma"),
        ..PplusConfig::default()
    };
    if let Some(library) = matches.get_one::<String>("library") {
        config.library_path = PathBuf::from(library);
    }

    let log_directives = matches
        .get_one::<String>("verbose")
        .map(|flags| verbose_directives(flags))
        .unwrap_or_default();

    Some(CliOptions {
        input,
        output,
        log_directives,
        config,
    })
}

/// `EnvFilter` directives for the `-v` letters
pub fn verbose_directives(flags: &str) -> Vec<String> {
    VERBOSE_TARGETS
        .iter()
        .filter(|(letter, _)| flags.contains('-') || flags.contains(*letter))
        .map(|(_, target)| format!("{target}=debug"))
        .collect()
}

/// `dir/name.pp` to `dir/name.prgm`
pub fn default_output(input: &Path) -> PathBuf {
    input.with_extension(PROGRAM_EXTENSION)
}

pub fn build_info() -> String {
    format!(
        "pplus {} ({})",
        pplus_core::VERSION,
        pplus_core::features().join(", ")
    )
}

/// Compile one file; `Ok(false)` when diagnostics failed the run
pub fn run(options: CliOptions) -> Result<bool> {
    let summary: CompileSummary = compile_to_file(&options.input, &options.output, options.config)
        .with_context(|| format!("failed to compile {}", options.input.display()))?;

    for message in &summary.errors {
        error!("{message}");
    }
    if summary.success() {
        info!(
            "wrote {} ({} bytes, {} warnings)",
            options.output.display(),
            summary.bytes_written,
            summary.warnings
        );
    }
    Ok(summary.success())
}
