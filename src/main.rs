//! Storefront CLI

use std::{io, process::ExitCode};

use storefront::observability;

use crate::cli::Cli;

mod cli;

#[tokio::main]
#[expect(clippy::print_stderr, reason = "Errors are reported to the user on stderr")]
async fn main() -> ExitCode {
    let cli = match Cli::load() {
        Ok(cli) => cli,
        Err(error) => error.exit(),
    };

    if let Err(error) = observability::init(&cli.config.logging) {
        eprintln!("{error}");
        return ExitCode::FAILURE;
    }

    let mut stdout = io::stdout().lock();

    match cli.run(&mut stdout).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}
