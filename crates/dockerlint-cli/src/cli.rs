//! Command-line arguments.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "dockerlint",
    version,
    about = "Run linters inside docker containers and report their diagnostics"
)]
pub struct Cli {
    /// Settings file (defaults to ./.dockerlint.toml, then the user config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lint a file by piping it to the linter inside its container
    Check {
        file: PathBuf,

        /// Profile to run (perl, perlcritic, flake8, rubocop, php)
        #[arg(short, long)]
        profile: Option<String>,

        /// Container to run the linter in, overriding settings
        #[arg(long)]
        container: Option<String>,

        /// Path to the docker executable
        #[arg(long)]
        docker: Option<PathBuf>,

        /// docker-machine whose environment should be used
        #[arg(long)]
        machine: Option<String>,

        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Extract diagnostics from captured linter output
    Parse {
        /// File holding the output; reads stdin when omitted
        input: Option<PathBuf>,

        #[arg(short, long)]
        profile: Option<String>,

        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// List the built-in profiles
    Profiles,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
