use clap::Parser;
use std::process::ExitCode;
use watchdawg::cli::{Cli, init_logging, run_cli};
use watchdawg::output::OutputFormatter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run_cli(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
