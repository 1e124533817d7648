// src/plane/mod.rs

//! Asynchronous file-descriptor consumer.
//!
//! An [`FdPlane`] owns one file descriptor and one reader thread. The thread
//! polls the descriptor together with a private wake pipe, reads chunks of at
//! most `chunk_size` bytes and hands each chunk to the `on_data` callback on
//! the reader thread itself. When the loop ends (EOF, read error, callback
//! stop, or cancellation) `on_done` runs exactly once.
//!
//! - [`options`] holds the creation options and callback set.
//! - [`wake`] is the self-pipe used to interrupt a waiting reader.
//! - [`reader`] is the reader-thread loop.
//! - [`handle`] owns the public `FdPlane` / `PlaneRef` types and the destroy
//!   protocol.

pub mod handle;
pub mod options;
pub mod reader;
pub mod wake;

pub use handle::{FdPlane, PlaneRef};
pub use options::{Callbacks, DataFn, DoneFn, FdPlaneOptions};
