//! Clockwork - command-line tool for building and packaging Clockwork game projects

use std::process::ExitCode;

use clockwork::cli;

fn main() -> ExitCode {
    cli::run()
}
