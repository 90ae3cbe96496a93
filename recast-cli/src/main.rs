// recast-cli/src/main.rs
//
// Entry point for the `recast` binary.
//
// Responsibilities include:
// - Parsing user-provided arguments (clap exits with 2 on malformed ones).
// - Setting up logging.
// - Resolving the arguments into a `TranscodeConfig`.
// - Forwarding Ctrl-C to running child processes through a cancellation token.
// - Managing process exit codes: 0 success, 1 failed inputs, 2 usage errors.

use clap::Parser;
use console::style;
use recast_cli::{Cli, EXIT_FAILURE, EXIT_SUCCESS, EXIT_USAGE, exit_code, logging, run_transcode};
use recast_core::external::CancellationToken;
use std::process;

fn report_error(error: &impl std::fmt::Display, usage: bool) {
    eprintln!("{} {}", style("recast:").bold(), error);
    if usage {
        eprintln!("Try `recast --help` for more information.");
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.general.debug);

    let config = match cli.to_config() {
        Ok(config) => config,
        Err(e) => {
            report_error(&e, true);
            process::exit(EXIT_USAGE);
        }
    };

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        log::warn!("Could not install the interrupt handler: {}", e);
    }

    let code = match run_transcode(&config, &cli.inputs, cancel) {
        Ok(summary) if summary.is_success() => EXIT_SUCCESS,
        Ok(_) => EXIT_FAILURE,
        Err(e) => {
            let code = exit_code(&e);
            report_error(&e, code == EXIT_USAGE);
            code
        }
    };
    process::exit(code);
}
