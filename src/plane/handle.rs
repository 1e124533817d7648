// src/plane/handle.rs

//! Public FdPlane handle and the destroy protocol.
//!
//! Ownership of the descriptor moves into the reader thread at creation and
//! comes back out through the thread's join result:
//!
//! - reader exits with the plane still `Active` → it returns the fd, and the
//!   external `destroy` closes it after joining;
//! - reader exits after a destroy request made on its own thread → it closes
//!   the fd itself, stores `Destroyed`, and returns `None`.
//!
//! The fd therefore has exactly one closer.

use std::fs::File;
use std::io;
use std::os::fd::{AsFd, AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::{self, JoinHandle};

use nix::fcntl::{FcntlArg, OFlag, fcntl};
use tracing::{debug, warn};

use crate::errors::{PlaneError, Result};
use crate::plane::options::{Callbacks, FdPlaneOptions};
use crate::plane::reader::{ReaderTask, run_reader};
use crate::plane::wake::WakePipe;
use crate::surface::Surface;
use crate::types::{DestroyOutcome, DestroyState};

/// State shared between the owning handle and the reader thread.
pub(crate) struct Shared {
    state: AtomicU8,
    surface: Arc<dyn Surface>,
    pub(crate) wake: WakePipe,
    raw_fd: RawFd,
}

impl Shared {
    pub(crate) fn state(&self) -> DestroyState {
        DestroyState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn request_destroy(&self) -> DestroyOutcome {
        match self.state.compare_exchange(
            DestroyState::Active as u8,
            DestroyState::DestroyRequested as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => DestroyOutcome::Deferred,
            Err(_) => DestroyOutcome::AlreadyRequested,
        }
    }

    pub(crate) fn mark_destroyed(&self) {
        self.state
            .store(DestroyState::Destroyed as u8, Ordering::Release);
    }
}

/// Borrowed view of a plane, handed to callbacks on the reader thread.
pub struct PlaneRef {
    pub(crate) shared: Arc<Shared>,
}

impl PlaneRef {
    pub fn surface(&self) -> &Arc<dyn Surface> {
        &self.shared.surface
    }

    pub fn raw_fd(&self) -> RawFd {
        self.shared.raw_fd
    }

    pub fn state(&self) -> DestroyState {
        self.shared.state()
    }

    /// Request destruction from inside a callback.
    ///
    /// The reader stops after the current callback returns, runs `on_done`
    /// (if it has not run yet) and then closes the descriptor.
    pub fn destroy(&self) -> DestroyOutcome {
        let outcome = self.shared.request_destroy();
        debug!(fd = self.shared.raw_fd, ?outcome, "destroy requested from reader thread");
        outcome
    }

    pub fn is_destroy_requested(&self) -> bool {
        self.shared.state() != DestroyState::Active
    }
}

impl std::fmt::Debug for PlaneRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaneRef")
            .field("fd", &self.shared.raw_fd)
            .field("state", &self.shared.state())
            .finish()
    }
}

/// Owner of one file descriptor and its reader thread.
///
/// Dropping the handle destroys the plane.
pub struct FdPlane {
    shared: Arc<Shared>,
    reader: Option<JoinHandle<Option<OwnedFd>>>,
}

impl FdPlane {
    /// Take ownership of `fd` and start reading it on a dedicated thread.
    ///
    /// Enables scrolling on `surface`. On failure the descriptor has already
    /// been closed and no thread is running.
    pub fn create<C: Send + 'static>(
        surface: Arc<dyn Surface>,
        options: FdPlaneOptions<C>,
        fd: OwnedFd,
        callbacks: Callbacks<C>,
    ) -> Result<Self> {
        let (on_data, on_done) = callbacks.into_parts()?;
        if options.chunk_size == 0 {
            return Err(PlaneError::ZeroChunkSize);
        }

        set_nonblocking(&fd)?;
        let wake = WakePipe::new()?;
        let raw_fd = fd.as_raw_fd();

        let shared = Arc::new(Shared {
            state: AtomicU8::new(DestroyState::Active as u8),
            surface,
            wake,
            raw_fd,
        });

        let was_scrolling = shared.surface.set_scrolling(true);

        let task = ReaderTask {
            shared: Arc::clone(&shared),
            file: File::from(fd),
            follow: options.follow,
            chunk_size: options.chunk_size,
            context: options.context,
            on_data,
            on_done,
        };

        let reader = thread::Builder::new()
            .name(format!("fdplane-{raw_fd}"))
            .spawn(move || run_reader(task));

        let reader = match reader {
            Ok(handle) => handle,
            Err(e) => {
                shared.surface.set_scrolling(was_scrolling);
                return Err(PlaneError::ThreadSpawn(e));
            }
        };

        debug!(fd = raw_fd, follow = ?options.follow, chunk_size = options.chunk_size, "fdplane created");

        Ok(Self {
            shared,
            reader: Some(reader),
        })
    }

    /// Like [`create`](Self::create), for a raw descriptor.
    ///
    /// A negative `fd` fails with [`PlaneError::InvalidFd`] before anything is
    /// allocated or touched.
    ///
    /// # Safety
    ///
    /// A non-negative `fd` must be an open descriptor that nothing else owns;
    /// the plane will close it.
    pub unsafe fn from_raw_fd<C: Send + 'static>(
        surface: Arc<dyn Surface>,
        options: FdPlaneOptions<C>,
        fd: RawFd,
        callbacks: Callbacks<C>,
    ) -> Result<Self> {
        if fd < 0 {
            return Err(PlaneError::InvalidFd(fd));
        }
        // SAFETY: caller guarantees `fd` is open and unowned.
        let owned = unsafe { OwnedFd::from_raw_fd(fd) };
        Self::create(surface, options, owned, callbacks)
    }

    pub fn surface(&self) -> &Arc<dyn Surface> {
        &self.shared.surface
    }

    pub fn raw_fd(&self) -> RawFd {
        self.shared.raw_fd
    }

    pub fn state(&self) -> DestroyState {
        self.shared.state()
    }

    /// Whether the reader thread has exited.
    pub fn is_finished(&self) -> bool {
        self.reader.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Whether the calling thread is this plane's reader thread.
    pub fn is_reader_thread(&self) -> bool {
        self.reader
            .as_ref()
            .is_some_and(|h| h.thread().id() == thread::current().id())
    }

    /// Destroy the plane.
    ///
    /// - On the reader thread (from a callback): records the request and
    ///   returns at once; the reader closes the fd when its loop unwinds.
    /// - Elsewhere: wakes the reader, joins it and closes the fd, returning
    ///   the close error if any.
    pub fn destroy(mut self) -> Result<()> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<()> {
        let Some(reader) = self.reader.take() else {
            return Ok(());
        };

        if reader.thread().id() == thread::current().id() {
            let outcome = self.shared.request_destroy();
            debug!(fd = self.shared.raw_fd, ?outcome, "self-destroy deferred to reader exit");
            // Dropping the handle detaches; the thread is already running
            // its own exit path.
            drop(reader);
            return Ok(());
        }

        if let Err(e) = self.shared.wake.wake() {
            warn!(fd = self.shared.raw_fd, error = %e, "failed to wake reader thread");
        }

        match reader.join() {
            Ok(Some(fd)) => {
                let res = close_fd(fd);
                self.shared.mark_destroyed();
                debug!(fd = self.shared.raw_fd, ok = res.is_ok(), "fdplane destroyed");
                res
            }
            Ok(None) => {
                debug!(fd = self.shared.raw_fd, "fdplane already closed by reader");
                Ok(())
            }
            Err(_) => Err(PlaneError::ReaderPanicked),
        }
    }
}

impl Drop for FdPlane {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            warn!(fd = self.shared.raw_fd, error = %e, "error destroying fdplane on drop");
        }
    }
}

impl std::fmt::Debug for FdPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FdPlane")
            .field("fd", &self.shared.raw_fd)
            .field("state", &self.shared.state())
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Close a descriptor and report the `close(2)` result.
pub(crate) fn close_fd(fd: OwnedFd) -> Result<()> {
    let raw = fd.into_raw_fd();
    // SAFETY: `raw` came from an OwnedFd we just gave up; nothing else
    // closes it.
    let rc = unsafe { nix::libc::close(raw) };
    if rc < 0 {
        Err(PlaneError::Close(io::Error::last_os_error()))
    } else {
        Ok(())
    }
}

/// Sets a descriptor to non-blocking mode so the reader can always return to
/// `poll` and notice a wake-up.
fn set_nonblocking(fd: &OwnedFd) -> Result<()> {
    let flags = fcntl(fd.as_fd(), FcntlArg::F_GETFL).map_err(PlaneError::NonBlocking)?;
    let new_flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
    fcntl(fd.as_fd(), FcntlArg::F_SETFL(new_flags)).map_err(PlaneError::NonBlocking)?;
    Ok(())
}
