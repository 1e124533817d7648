// src/plane/wake.rs

//! Self-pipe used to interrupt a reader waiting in `poll`.

use std::fs::File;
use std::io::{self, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::time::Duration;

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::unistd::pipe2;

use crate::errors::{PlaneError, Result};

/// Both ends are non-blocking and close-on-exec, so a forked child never
/// inherits them.
#[derive(Debug)]
pub struct WakePipe {
    rx: File,
    tx: File,
}

impl WakePipe {
    pub fn new() -> Result<Self> {
        let (rx, tx) =
            pipe2(OFlag::O_CLOEXEC | OFlag::O_NONBLOCK).map_err(PlaneError::WakePipe)?;
        Ok(Self {
            rx: File::from(rx),
            tx: File::from(tx),
        })
    }

    /// Post a wake-up. A full pipe already holds a pending wake-up, so
    /// `WouldBlock` is not an error.
    pub fn wake(&self) -> io::Result<()> {
        match (&self.tx).write(&[1u8]) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn read_end(&self) -> BorrowedFd<'_> {
        self.rx.as_fd()
    }

    /// Block until woken or until `timeout` elapses (`None` waits forever).
    ///
    /// Returns `true` if a wake-up is pending.
    pub fn wait(&self, timeout: Option<Duration>) -> std::result::Result<bool, Errno> {
        let mut fds = [PollFd::new(self.read_end(), PollFlags::POLLIN)];
        loop {
            match poll(&mut fds, poll_timeout(timeout)) {
                Ok(0) => return Ok(false),
                Ok(_) => return Ok(true),
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Convert an optional duration to a poll timeout.
///
/// Durations are clamped to `u16::MAX` milliseconds; callers loop, so a long
/// wait simply takes several polls.
pub(crate) fn poll_timeout(timeout: Option<Duration>) -> PollTimeout {
    match timeout {
        None => PollTimeout::NONE,
        Some(d) => {
            let ms = d.as_millis().min(u128::from(u16::MAX)) as u16;
            PollTimeout::from(ms)
        }
    }
}
