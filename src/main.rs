mod call_queue;
mod cli;
mod logging;
mod report;
mod scenarios;
mod shared_queue;
mod types;

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use crate::cli::{Cli, Command};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command.unwrap_or(Command::Demo) {
        Command::Demo => scenarios::run_demo(),
        Command::Bench(args) => scenarios::run_benchmark(&args.config()),
        Command::Stress(args) => scenarios::run_stress(&args.sweep()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "run failed");
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
