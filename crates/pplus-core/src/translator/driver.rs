//! Compile a P+ file into a PPL program file.
//!
//! The program is written as UTF-16LE with a byte order mark. A run that
//! recorded an Error or Critical diagnostic leaves no output file behind.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use super::compile_file;
use crate::error::PplusError;
use crate::{PplusConfig, Result};

/// Summary of compile operations
#[derive(Debug, Clone, Default)]
pub struct CompileSummary {
    pub files_processed: u64,
    pub files_written: u64,
    pub bytes_written: u64,
    pub warnings: u64,
    pub errors: Vec<String>,
}

impl CompileSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// No Error or Critical diagnostic was recorded
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Translate `input` and write the program to `output`.
///
/// Non-fatal problems end up in the summary's `errors`; only a Critical
/// problem (unreadable file, include cycle) or a failed write is returned
/// as `Err`.
pub fn compile_to_file(input: impl AsRef<Path>, output: impl AsRef<Path>, config: PplusConfig) -> Result<CompileSummary> {
    let input = input.as_ref();
    let output = output.as_ref();
    let mut summary = CompileSummary::new();
    summary.files_processed += 1;

    let translation = match compile_file(input, config) {
        Ok(translation) => translation,
        Err(e) => {
            discard(output);
            return Err(e);
        }
    };

    summary.warnings = translation
        .diagnostics
        .entries()
        .iter()
        .filter(|d| !d.severity.is_failure())
        .count() as u64;
    summary.errors = translation
        .diagnostics
        .entries()
        .iter()
        .filter(|d| d.severity.is_failure())
        .map(ToString::to_string)
        .collect();

    if translation.has_errors() {
        warn!(
            "{}: {} error(s), no output written",
            input.display(),
            summary.errors.len()
        );
        discard(output);
        return Ok(summary);
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PplusError::io(parent, e))?;
    }
    let bytes = translation.to_utf16le();
    fs::write(output, &bytes).map_err(|e| PplusError::io(output, e))?;

    summary.files_written += 1;
    summary.bytes_written = bytes.len() as u64;
    info!("{} -> {} ({} bytes)", input.display(), output.display(), bytes.len());
    Ok(summary)
}

/// Remove a stale or partial output file
fn discard(output: &Path) {
    if output.exists() {
        if let Err(e) = fs::remove_file(output) {
            warn!("cannot remove {}: {}", output.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::decode_utf16le;
    use tempfile::TempDir;

    #[test]
    fn test_writes_utf16_program() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let input = dir.path().join("hello.pp");
        let output = dir.path().join("out/hello.prgm");
        fs::write(&input, "export hello()\nbegin\nreturn 1 >= 0;\nend;\n")?;

        let summary = compile_to_file(&input, &output, PplusConfig::default())?;
        assert!(summary.success());
        assert_eq!(summary.files_written, 1);

        let bytes = fs::read(&output)?;
        assert_eq!(&bytes[..2], &[0xFF, 0xFE]);
        assert_eq!(summary.bytes_written, bytes.len() as u64);
        assert_eq!(
            decode_utf16le(&bytes).as_deref(),
            Some("EXPORT hello()\nBEGIN\n  RETURN 1 ≥ 0;\nEND;\n")
        );
        Ok(())
    }

    #[test]
    fn test_errors_remove_output() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let input = dir.path().join("broken.pp");
        let output = dir.path().join("broken.prgm");
        fs::write(&output, "stale")?;
        fs::write(&input, "begin\nx := \\`1/0`;\nend;\n")?;

        let summary = compile_to_file(&input, &output, PplusConfig::default())?;
        assert!(!summary.success());
        assert_eq!(summary.files_written, 0);
        assert!(!output.exists());
        Ok(())
    }

    #[test]
    fn test_missing_input_is_an_error() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let result = compile_to_file(dir.path().join("none.pp"), dir.path().join("none.prgm"), PplusConfig::default());
        assert!(matches!(result, Err(PplusError::Io { .. })));
        Ok(())
    }
}
