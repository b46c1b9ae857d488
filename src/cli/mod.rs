pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{ClassifyArgs, CliArgs, Commands, ConfigArgs, DocumentArgs, ScanArgs};
pub use output::{OutputFormat, OutputFormatter};
