use std::process::ExitCode;

use pplus_cli::{build_command, build_info, options_from_matches, run};
use pplus_core::init_tracing;

fn main() -> ExitCode {
    let matches = build_command().get_matches();

    if matches.get_flag("build") {
        println!("{}", build_info());
        return ExitCode::SUCCESS;
    }
    let Some(options) = options_from_matches(&matches) else {
        return ExitCode::FAILURE;
    };

    init_tracing(&options.log_directives);

    match run(options) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
