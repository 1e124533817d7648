// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod plane;
pub mod subproc;
pub mod surface;
pub mod types;

use std::path::PathBuf;

use anyhow::Result;
use tracing::debug;

use crate::cli::{CliArgs, Command};
use crate::config::loader::{default_config_path, load_or_default};

pub use crate::errors::PlaneError;
pub use crate::plane::{Callbacks, FdPlane, FdPlaneOptions, PlaneRef};
pub use crate::subproc::{LaunchSpec, Program, Subprocess, SubprocessOptions, TeardownPolicy};
pub use crate::surface::{Compositor, Surface};
pub use crate::types::{
    Capture, DestroyOutcome, DestroyState, DoneReason, ExitStatus, FollowMode, ReadControl,
};

/// High-level entry point used by `main.rs`.
///
/// Loads config (an explicit `--config` must exist; the default file is
/// optional), then dispatches the subcommand. Returns the process exit code.
pub async fn run(args: CliArgs) -> Result<i32> {
    let (config_path, explicit) = match &args.config {
        Some(p) => (PathBuf::from(p), true),
        None => (default_config_path(), false),
    };
    let cfg = load_or_default(&config_path, explicit)?;
    debug!(config = %config_path.display(), ?cfg, "configuration loaded");

    match args.command {
        Command::Run(run_args) => exec::run_command(&cfg, run_args).await,
        Command::Tail(tail_args) => exec::tail_file(&cfg, tail_args).await,
    }
}
