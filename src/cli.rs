use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "toolbelt")]
#[command(about = "Persistent shell and file editor tools for coding agents")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to ./toolbelt.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve `bash` and `editor` requests as JSON lines on stdin/stdout
    Serve,

    /// Run one command through `sh -c` with the configured limits
    Exec {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}
