// src/errors.rs

//! Crate-wide error type and result alias.

use std::os::fd::RawFd;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaneError {
    #[error("invalid file descriptor: {0}")]
    InvalidFd(RawFd),

    #[error("missing {0} callback")]
    MissingCallback(&'static str),

    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("failed to create wake pipe: {0}")]
    WakePipe(#[source] Errno),

    #[error("failed to set non-blocking mode: {0}")]
    NonBlocking(#[source] Errno),

    #[error("failed to spawn reader thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    #[error("failed to create output pipe: {0}")]
    Pipe(#[source] Errno),

    #[error("failed to fork: {0}")]
    Fork(#[source] Errno),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to close file descriptor: {0}")]
    Close(#[source] std::io::Error),

    #[error("reader thread panicked")]
    ReaderPanicked,

    #[error("failed to send {signal:?} to pid {pid}: {source}")]
    Signal {
        signal: Signal,
        pid: i32,
        #[source]
        source: Errno,
    },

    #[error("failed to wait for child: {0}")]
    Wait(#[source] Errno),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PlaneError>;
