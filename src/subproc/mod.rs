// src/subproc/mod.rs

//! Subprocess spawning with captured output.
//!
//! - [`launch`] creates the capture pipe, forks and execs.
//! - [`handle`] owns the `Subprocess` type and its spawn variants.
//! - [`teardown`] implements signal → bounded wait → kill → reap.

pub mod handle;
pub mod launch;
pub mod teardown;

pub use handle::{Subprocess, SubprocessOptions};
pub use launch::{LaunchSpec, Program};
pub use teardown::TeardownPolicy;
