//! File handling of the command-line front end.

use std::fs;

use anyhow::Result;
use pplus_cli::{build_command, options_from_matches, run, CliOptions};
use pplus_core::output::decode_utf16le;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn parse(args: &[&str]) -> Result<CliOptions> {
    let matches = build_command().try_get_matches_from(args)?;
    options_from_matches(&matches).ok_or_else(|| anyhow::anyhow!("no input"))
}

#[test]
fn test_compiles_next_to_input() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("hello.pp");
    fs::write(&input, "export hello()\nbegin\nreturn 42;\nend;\n")?;

    let input_arg = input.to_string_lossy().into_owned();
    let options = parse(&["pplus", &input_arg])?;
    assert!(run(options)?);

    let bytes = fs::read(dir.path().join("hello.prgm"))?;
    assert_eq!(
        decode_utf16le(&bytes).as_deref(),
        Some("EXPORT hello()\nBEGIN\n  RETURN 42;\nEND;\n")
    );
    Ok(())
}

#[test]
fn test_failed_run_leaves_no_output() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("broken.pp");
    let output = dir.path().join("broken.prgm");
    fs::write(&input, "begin\nx := \\`1/0`;\nend;\n")?;

    let input_arg = input.to_string_lossy().into_owned();
    let output_arg = output.to_string_lossy().into_owned();
    let options = parse(&["pplus", &input_arg, "-o", &output_arg])?;
    assert!(!run(options)?);
    assert!(!output.exists());
    Ok(())
}

#[test]
fn test_library_includes() -> Result<()> {
    let dir = TempDir::new()?;
    let lib = dir.path().join("lib");
    fs::create_dir(&lib)?;
    fs::write(lib.join("consts.pplib"), "#define ANSWER 42\n")?;
    let input = dir.path().join("main.pp");
    fs::write(&input, "#include <consts>\nbegin\nreturn ANSWER;\nend;\n")?;

    let input_arg = input.to_string_lossy().into_owned();
    let lib_arg = lib.to_string_lossy().into_owned();
    let options = parse(&["pplus", &input_arg, "-l", &lib_arg, "--pragma"])?;
    let output = options.output.clone();
    assert!(run(options)?);

    let text = decode_utf16le(&fs::read(output)?).unwrap_or_default();
    assert!(text.starts_with("#pragma mode"));
    assert!(text.contains("RETURN 42;"));
    Ok(())
}

#[test]
fn test_missing_input_is_an_error() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("missing.pp").to_string_lossy().into_owned();
    let options = parse(&["pplus", &input])?;
    assert!(run(options).is_err());
    Ok(())
}
