#![allow(dead_code)]

use std::fs::File;
use std::io::{self, Write};
use std::os::fd::OwnedFd;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fdplane::subproc::{SubprocessOptions, TeardownPolicy};
use fdplane::plane::FdPlaneOptions;
use nix::unistd::pipe;

use crate::surface::RecordingSurface;

/// A pipe: the read end for a plane, the write end as a `File`.
pub fn pipe_pair() -> (OwnedFd, File) {
    let (read, write) = pipe().expect("pipe");
    (read, File::from(write))
}

pub fn surface() -> Arc<RecordingSurface> {
    Arc::new(RecordingSurface::new())
}

/// Teardown policy with a short grace period so tests stay fast.
pub fn fast_teardown() -> TeardownPolicy {
    TeardownPolicy {
        grace_period: Duration::from_millis(200),
        poll_interval: Duration::from_millis(5),
    }
}

pub fn subprocess_options() -> SubprocessOptions<()> {
    SubprocessOptions::new(FdPlaneOptions::default()).teardown(fast_teardown())
}

/// Keep writing to `writer` until the read end has been closed.
///
/// Relies on `SIGPIPE` being ignored, which the Rust runtime does for test
/// binaries.
pub fn wait_for_reader_closed(writer: &mut File) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        match writer.write(b"x") {
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => return true,
            _ => std::thread::sleep(Duration::from_millis(10)),
        }
    }
    false
}
