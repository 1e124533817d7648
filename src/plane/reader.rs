// src/plane/reader.rs

//! Reader-thread loop.

use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsFd, OwnedFd};
use std::sync::Arc;

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, poll};
use tracing::{debug, trace, warn};

use crate::plane::handle::{PlaneRef, Shared, close_fd};
use crate::plane::options::{DataFn, DoneFn};
use crate::plane::wake::poll_timeout;
use crate::types::{DestroyState, DoneReason, FollowMode};

/// Everything the reader thread owns.
pub(crate) struct ReaderTask<C> {
    pub(crate) shared: Arc<Shared>,
    pub(crate) file: File,
    pub(crate) follow: FollowMode,
    pub(crate) chunk_size: usize,
    pub(crate) context: C,
    pub(crate) on_data: Box<DataFn<C>>,
    pub(crate) on_done: Box<DoneFn<C>>,
}

enum Readiness {
    Readable,
    Woken,
}

/// Thread body. Returns the descriptor if the caller still has to close it.
pub(crate) fn run_reader<C>(task: ReaderTask<C>) -> Option<OwnedFd> {
    let ReaderTask {
        shared,
        file,
        follow,
        chunk_size,
        mut context,
        mut on_data,
        on_done,
    } = task;

    let plane = PlaneRef {
        shared: Arc::clone(&shared),
    };
    let fd = plane.raw_fd();
    let mut buf = vec![0u8; chunk_size];
    let mut chunks: u64 = 0;
    let mut total: u64 = 0;

    debug!(fd, "reader thread started");

    let reason = loop {
        match wait_readable(&file, &shared) {
            Ok(Readiness::Woken) => break DoneReason::Cancelled,
            Ok(Readiness::Readable) => {}
            Err(errno) => break DoneReason::ReadError(errno),
        }

        match (&file).read(&mut buf) {
            Ok(0) => match follow {
                FollowMode::Off => break DoneReason::Eof,
                FollowMode::On { interval } => {
                    trace!(fd, ?interval, "eof while following; re-arming read");
                    match shared.wake.wait(Some(interval)) {
                        Ok(true) => break DoneReason::Cancelled,
                        Ok(false) => continue,
                        Err(errno) => break DoneReason::ReadError(errno),
                    }
                }
            },
            Ok(n) => {
                chunks += 1;
                total += n as u64;
                trace!(fd, len = n, "chunk read");
                let control = on_data(&plane, &buf[..n], &mut context);
                if control.is_stop() || plane.is_destroy_requested() {
                    break DoneReason::Stopped;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            Err(e) => {
                let errno = e.raw_os_error().map_or(Errno::EIO, Errno::from_raw);
                break DoneReason::ReadError(errno);
            }
        }
    };

    debug!(fd, ?reason, chunks, bytes = total, "reader loop finished");
    on_done(&plane, reason, &mut context);

    // Read once: a destroy requested on this thread, at any point up to and
    // including `on_done`, is honoured here.
    if shared.state() == DestroyState::DestroyRequested {
        if let Err(e) = close_fd(OwnedFd::from(file)) {
            warn!(fd, error = %e, "close failed during deferred destroy");
        }
        shared.mark_destroyed();
        debug!(fd, "deferred destroy complete");
        return None;
    }

    Some(OwnedFd::from(file))
}

/// Poll the data fd and the wake pipe together.
///
/// A pending wake-up takes priority over pending data. `POLLHUP`/`POLLERR`
/// count as readable so the following `read` can report EOF or the error.
fn wait_readable(file: &File, shared: &Shared) -> Result<Readiness, Errno> {
    let mut fds = [
        PollFd::new(file.as_fd(), PollFlags::POLLIN),
        PollFd::new(shared.wake.read_end(), PollFlags::POLLIN),
    ];

    loop {
        match poll(&mut fds, poll_timeout(None)) {
            Ok(_) => {}
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e),
        }

        let data = fds[0].revents().unwrap_or(PollFlags::empty());
        let wake = fds[1].revents().unwrap_or(PollFlags::empty());

        if !wake.is_empty() {
            return Ok(Readiness::Woken);
        }
        if data.contains(PollFlags::POLLNVAL) {
            return Err(Errno::EBADF);
        }
        if data.intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR) {
            return Ok(Readiness::Readable);
        }
    }
}
