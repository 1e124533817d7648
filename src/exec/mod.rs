// src/exec/mod.rs

//! Async shell around the synchronous plane core.
//!
//! Callbacks run on reader threads and must not block on the runtime, so
//! they only forward [`PlaneEvent`]s over a bounded channel. The tokio side
//! prints chunks, watches for Ctrl-C and performs blocking teardown on the
//! blocking pool.
//!
//! - [`forward`] holds the event type, the forwarding callbacks and the
//!   stop-pattern matcher.
//! - [`run`] drives `fdplane run` (spawn a child, stream its output).
//! - [`tail`] drives `fdplane tail` (stream a file or stdin).

pub mod forward;
pub mod run;
pub mod tail;

pub use forward::{
    ForwardContext, LineMatcher, PlaneEvent, PumpOutcome, forwarding_callbacks, teardown_blocking,
};
pub use run::run_command;
pub use tail::tail_file;
