//! Command-line flags.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::schema::ConfigOverrides;

#[derive(Debug, Parser)]
#[command(name = "statestored")]
#[command(about = "State store daemon: service membership and subscription updates", long_about = None)]
pub struct Flags {
    /// TOML file with configuration values. Command-line flags win over it.
    #[arg(long = "config_file", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Print the version string and exit
    Version,
}

impl Flags {
    /// True when the only positional argument is `version`.
    pub fn is_version_query(&self) -> bool {
        matches!(self.command, Some(Command::Version))
    }
}
