// powertrim-cli/src/main.rs
//
// Entry point of the `powertrim` binary.
//
// Parses the command line, dispatches to the command implementations and
// turns their result into the process exit code:
// - 0 when the job finished
// - 1 on argument, configuration or job failures
// - 130 when the job was cancelled

use clap::Parser;
use powertrim_cli::{Cli, Commands, run_export, run_probe, terminal};
use std::process;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and are not errors
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    let result = match cli.command {
        Commands::Export(args) => run_export(args, cli.verbose),
        Commands::Probe(args) => run_probe(args, cli.verbose).map(|()| 0),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            terminal::print_error("Error", &format!("{e:#}"), None);
            process::exit(1);
        }
    }
}
