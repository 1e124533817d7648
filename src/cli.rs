// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `fdplane`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "fdplane",
    version,
    about = "Stream a file descriptor or a child process's output through an FdPlane.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Fdplane.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FDPLANE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Spawn a program and print its captured output.
    Run(RunArgs),
    /// Stream a file, or `-` for stdin.
    Tail(TailArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Execute PROGRAM as an exact path instead of searching `PATH`.
    #[arg(long)]
    pub path: bool,

    /// Capture only stdout; stderr stays attached to the terminal.
    #[arg(long)]
    pub stdout_only: bool,

    /// Run with an explicit environment (repeatable). Once given, the child
    /// sees only these variables.
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Stop capturing (and tear the child down) once an output line matches.
    #[arg(long, value_name = "REGEX")]
    pub stop_on: Option<String>,

    /// Prefix every output line with `[NAME]`.
    #[arg(long, value_name = "NAME")]
    pub prefix: Option<String>,

    /// Program and arguments.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct TailArgs {
    /// Keep reading after end-of-file.
    #[arg(long, short)]
    pub follow: bool,

    /// Stop once an output line matches.
    #[arg(long, value_name = "REGEX")]
    pub stop_on: Option<String>,

    /// Prefix every output line with `[NAME]`.
    #[arg(long, value_name = "NAME")]
    pub prefix: Option<String>,

    /// File to read.
    pub file: String,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
