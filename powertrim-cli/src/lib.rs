// powertrim-cli/src/lib.rs
//
// Library portion of the PowerTrim CLI application.
// Contains argument definitions, segment loaders and command logic.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod segments;
pub mod terminal;

/// Result type of the CLI commands.
pub type CliResult<T> = anyhow::Result<T>;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands, ExportArgs, ProbeArgs};
pub use commands::export::run_export;
pub use commands::probe::run_probe;
