//! Runs alone in its own binary: it closes the process's stdout and stderr
//! while spawning.

mod common;

use common::{dyn_surface, surface};
use fdplane::subproc::{LaunchSpec, Subprocess};
use fdplane::types::{Capture, ExitStatus};
use fdplane_test_utils::builders::subprocess_options;
use fdplane_test_utils::recorder::recording_callbacks;
use nix::libc;

/// Puts the saved stdout/stderr back when dropped, even on panic.
struct StdioRestore {
    saved_out: i32,
    saved_err: i32,
}

impl StdioRestore {
    fn close_stdio() -> Self {
        // SAFETY: plain fd syscalls on descriptors this process owns.
        unsafe {
            let saved_out = libc::dup(libc::STDOUT_FILENO);
            let saved_err = libc::dup(libc::STDERR_FILENO);
            assert!(saved_out >= 0 && saved_err >= 0);
            libc::close(libc::STDOUT_FILENO);
            libc::close(libc::STDERR_FILENO);
            Self {
                saved_out,
                saved_err,
            }
        }
    }
}

impl Drop for StdioRestore {
    fn drop(&mut self) {
        // SAFETY: see above.
        unsafe {
            libc::dup2(self.saved_out, libc::STDOUT_FILENO);
            libc::dup2(self.saved_err, libc::STDERR_FILENO);
            libc::close(self.saved_out);
            libc::close(self.saved_err);
        }
    }
}

#[test]
fn test_combined_capture_with_parent_stdio_closed() {
    let _restore = StdioRestore::close_stdio();

    // With 1 and 2 free, the capture pipe lands on them and the write end
    // is already the child's stderr.
    let (callbacks, log) = recording_callbacks::<()>();
    let spec = LaunchSpec::search("sh")
        .args(["-c", "echo out; echo err 1>&2"])
        .capture(Capture::Combined);
    let mut child =
        Subprocess::spawn(dyn_surface(&surface()), subprocess_options(), spec, callbacks).unwrap();

    let (data, _) = log.wait_done();
    let status = child.wait().unwrap();
    child.destroy().unwrap();

    assert_eq!(String::from_utf8_lossy(&data), "out\nerr\n");
    assert_eq!(status, ExitStatus::Exited(0));
}
