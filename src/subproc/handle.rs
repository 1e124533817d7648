// src/subproc/handle.rs

//! `Subprocess`: a child pid paired with an FdPlane over its output.

use std::ffi::OsStr;
use std::os::fd::OwnedFd;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::Signal;
use nix::unistd::Pid;
use tracing::{debug, warn};

use crate::errors::{PlaneError, Result};
use crate::plane::{Callbacks, FdPlane, FdPlaneOptions};
use crate::subproc::launch::{LaunchSpec, launch_with_pipe};
use crate::subproc::teardown::{self, TeardownPolicy};
use crate::surface::Surface;
use crate::types::ExitStatus;

/// Options for the spawn family.
#[derive(Debug, Clone)]
pub struct SubprocessOptions<C> {
    pub plane: FdPlaneOptions<C>,
    pub teardown: TeardownPolicy,
}

impl<C> SubprocessOptions<C> {
    pub fn new(plane: FdPlaneOptions<C>) -> Self {
        Self {
            plane,
            teardown: TeardownPolicy::default(),
        }
    }

    pub fn teardown(mut self, teardown: TeardownPolicy) -> Self {
        self.teardown = teardown;
        self
    }
}

impl Default for SubprocessOptions<()> {
    fn default() -> Self {
        Self::new(FdPlaneOptions::default())
    }
}

/// A spawned child whose stdout (and usually stderr) feed an [`FdPlane`].
///
/// The child is always reaped before the handle goes away: [`destroy`]
/// signals it if needed, and dropping the handle does the same.
///
/// [`destroy`]: Subprocess::destroy
pub struct Subprocess {
    pid: Pid,
    program: String,
    output: Option<FdPlane>,
    status: Option<ExitStatus>,
    teardown: TeardownPolicy,
}

impl Subprocess {
    /// Spawn `spec`, capturing its output into a new FdPlane bound to
    /// `surface`.
    ///
    /// Callbacks and options are validated before forking. If the plane
    /// cannot be created after the fork, the child is killed and reaped
    /// before the error is returned.
    pub fn spawn<C: Send + 'static>(
        surface: Arc<dyn Surface>,
        options: SubprocessOptions<C>,
        spec: LaunchSpec,
        callbacks: Callbacks<C>,
    ) -> Result<Self> {
        callbacks.validate()?;
        if options.plane.chunk_size == 0 {
            return Err(PlaneError::ZeroChunkSize);
        }

        let SubprocessOptions { plane, teardown } = options;
        Self::spawn_with(&spec, teardown, move |_pid, output| {
            FdPlane::create(surface, plane, output, callbacks)
        })
    }

    /// Spawn `spec` and let `attach` build the FdPlane over the read end of
    /// the output pipe.
    ///
    /// `attach` runs in the parent after the fork. If it fails, the child is
    /// sent `SIGKILL` and reaped before the error is returned, so no zombie
    /// is left behind.
    pub fn spawn_with<F>(spec: &LaunchSpec, teardown: TeardownPolicy, attach: F) -> Result<Self>
    where
        F: FnOnce(Pid, OwnedFd) -> Result<FdPlane>,
    {
        let launched = launch_with_pipe(spec)?;
        let pid = launched.pid;

        let output = match attach(pid, launched.output) {
            Ok(plane) => plane,
            Err(err) => {
                warn!(%pid, error = %err, "output plane creation failed; killing child");
                if let Err(kill_err) = teardown::kill_and_reap(pid) {
                    warn!(%pid, error = %kill_err, "failed to kill child after plane failure");
                }
                return Err(err);
            }
        };

        Ok(Self {
            pid,
            program: spec.display_name(),
            output: Some(output),
            status: None,
            teardown,
        })
    }

    /// Exact path, parent environment (`execv`).
    pub fn spawn_v<C, P, I, S>(
        surface: Arc<dyn Surface>,
        options: SubprocessOptions<C>,
        path: P,
        args: I,
        callbacks: Callbacks<C>,
    ) -> Result<Self>
    where
        C: Send + 'static,
        P: AsRef<Path>,
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let spec = LaunchSpec::path(path.as_ref()).args(args);
        Self::spawn(surface, options, spec, callbacks)
    }

    /// `PATH` search, parent environment (`execvp`).
    pub fn spawn_vp<C, P, I, S>(
        surface: Arc<dyn Surface>,
        options: SubprocessOptions<C>,
        program: P,
        args: I,
        callbacks: Callbacks<C>,
    ) -> Result<Self>
    where
        C: Send + 'static,
        P: AsRef<OsStr>,
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let spec = LaunchSpec::search(program).args(args);
        Self::spawn(surface, options, spec, callbacks)
    }

    /// `PATH` search with exactly the given environment (`execvpe`).
    pub fn spawn_vpe<C, P, I, S, E, K, V>(
        surface: Arc<dyn Surface>,
        options: SubprocessOptions<C>,
        program: P,
        args: I,
        env: E,
        callbacks: Callbacks<C>,
    ) -> Result<Self>
    where
        C: Send + 'static,
        P: AsRef<OsStr>,
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
        E: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        let spec = LaunchSpec::search(program).args(args).env_clear().envs(env);
        Self::spawn(surface, options, spec, callbacks)
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn surface(&self) -> Option<&Arc<dyn Surface>> {
        self.output.as_ref().map(FdPlane::surface)
    }

    pub fn output(&self) -> Option<&FdPlane> {
        self.output.as_ref()
    }

    /// Status of the child if it has been reaped.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.status
    }

    /// Reap the child if it has exited, without blocking.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        if self.status.is_none() {
            self.status = teardown::try_reap(self.pid)?;
        }
        Ok(self.status)
    }

    /// Block until the child exits, then reap it.
    pub fn wait(&mut self) -> Result<ExitStatus> {
        if let Some(status) = self.status {
            return Ok(status);
        }
        let status = teardown::reap(self.pid)?;
        self.status = Some(status);
        Ok(status)
    }

    /// Wait at most `timeout` for the child to exit, reaping it if it did.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<ExitStatus>> {
        if self.status.is_none() {
            self.status = teardown::wait_for_exit(self.pid, timeout, self.teardown.poll_interval)?;
        }
        Ok(self.status)
    }

    /// Send a signal to a child that has not been reaped yet.
    pub fn signal(&self, signal: Signal) -> Result<()> {
        if self.status.is_some() {
            return Ok(());
        }
        teardown::send_signal(self.pid, signal)
    }

    /// Signal the child if it is still running, reap it, then destroy the
    /// output plane. Returns the child's exit status.
    ///
    /// Safe to call from the output plane's own callbacks: the plane part
    /// is then deferred to the reader thread's exit.
    pub fn destroy(mut self) -> Result<ExitStatus> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<ExitStatus> {
        let reaped = match self.status {
            Some(status) => Ok(status),
            None => teardown::terminate(self.pid, &self.teardown).inspect(|status| {
                self.status = Some(*status);
            }),
        };

        let closed = match self.output.take() {
            Some(plane) => plane.destroy(),
            None => Ok(()),
        };

        debug!(pid = %self.pid, program = %self.program, reaped = reaped.is_ok(), "subprocess destroyed");

        let status = reaped?;
        closed?;
        Ok(status)
    }
}

impl Drop for Subprocess {
    fn drop(&mut self) {
        if self.output.is_none() && self.status.is_some() {
            return;
        }
        if let Err(e) = self.teardown() {
            warn!(pid = %self.pid, error = %e, "error tearing down subprocess on drop");
        }
    }
}

impl std::fmt::Debug for Subprocess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subprocess")
            .field("pid", &self.pid)
            .field("program", &self.program)
            .field("output", &self.output)
            .field("status", &self.status)
            .finish()
    }
}
