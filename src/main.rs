//! taskdeps - dependency-aware task lists

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = taskdeps::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
