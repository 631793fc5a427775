use std::process::ExitCode;

use clap::Parser;
use docsort_lib::config::Settings;

fn main() -> ExitCode {
    let settings = Settings::parse();
    match docsort_lib::run(settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("docsort: {e}");
            ExitCode::FAILURE
        }
    }
}
