//! Command-line interface.

mod commands;
mod serve;

pub use commands::{build_parser, is_verbose, run, Cli};
pub use serve::parse_bind_address;
