// Entrypoint for the CLI application.
// - Keeps `main` small: set up logging, parse flags and hand them to `cli::run`.
// - Errors are printed with their full context chain and exit non-zero.

use std::process::ExitCode;

use clap::Parser;
use crossterm::style::Stylize;
use cyverse_irods::cli::{run, Cli};

fn main() -> ExitCode {
    // `CYRODS_LOG` takes env_logger filter syntax, e.g. `info` or
    // `cyverse_irods=debug`.
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("CYRODS_LOG", "warn")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
