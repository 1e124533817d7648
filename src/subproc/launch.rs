// src/subproc/launch.rs

//! Pipe + fork + exec.
//!
//! Everything the child needs is built *before* forking: the C strings, the
//! NULL-terminated `argv`/`envp` pointer arrays and the message printed when
//! exec fails. The child never allocates and only performs async-signal-safe
//! calls: `dup2`, `fcntl`, `exec*`, `write` and `_exit`.

use std::ffi::{CString, OsStr, OsString, c_char};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;
use std::ptr;

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::libc;
use nix::unistd::{ForkResult, Pid, fork, pipe2};
use tracing::{debug, info};

use crate::errors::{PlaneError, Result};
use crate::types::Capture;

/// How the program is located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Program {
    /// Executed exactly as given.
    Path(PathBuf),
    /// Resolved through `PATH` when it contains no slash.
    Search(OsString),
}

impl Program {
    fn as_os_str(&self) -> &OsStr {
        match self {
            Program::Path(p) => p.as_os_str(),
            Program::Search(s) => s.as_os_str(),
        }
    }

    fn is_search(&self) -> bool {
        matches!(self, Program::Search(_))
    }
}

/// Description of one child process.
///
/// `args` excludes `argv[0]`, which defaults to the program as given and can
/// be overridden with [`LaunchSpec::arg0`].
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    program: Program,
    arg0: Option<OsString>,
    args: Vec<OsString>,
    env: Option<Vec<(OsString, OsString)>>,
    capture: Capture,
}

impl LaunchSpec {
    pub fn new(program: Program) -> Self {
        Self {
            program,
            arg0: None,
            args: Vec::new(),
            env: None,
            capture: Capture::default(),
        }
    }

    /// Exact path, `execv` semantics.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::new(Program::Path(path.into()))
    }

    /// `PATH` lookup, `execvp` semantics.
    pub fn search(name: impl AsRef<OsStr>) -> Self {
        Self::new(Program::Search(name.as_ref().to_os_string()))
    }

    pub fn arg0(mut self, arg0: impl AsRef<OsStr>) -> Self {
        self.arg0 = Some(arg0.as_ref().to_os_string());
        self
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Add one variable to an explicit environment.
    ///
    /// Once any variable is set the child gets *only* the explicit
    /// environment, not the parent's.
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env
            .get_or_insert_with(Vec::new)
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        let env = self.env.get_or_insert_with(Vec::new);
        for (k, v) in vars {
            env.push((k.as_ref().to_os_string(), v.as_ref().to_os_string()));
        }
        self
    }

    /// Start from an empty explicit environment.
    pub fn env_clear(mut self) -> Self {
        self.env = Some(Vec::new());
        self
    }

    pub fn capture(mut self, capture: Capture) -> Self {
        self.capture = capture;
        self
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn capture_mode(&self) -> Capture {
        self.capture
    }

    pub fn has_env(&self) -> bool {
        self.env.is_some()
    }

    pub fn display_name(&self) -> String {
        self.program.as_os_str().to_string_lossy().into_owned()
    }
}

/// A forked child and the read end of its output pipe.
#[derive(Debug)]
pub(crate) struct Launched {
    pub(crate) pid: Pid,
    pub(crate) output: OwnedFd,
}

/// C strings and pointer arrays prepared ahead of `fork`.
///
/// `argv_ptrs` / `envp_ptrs` point into the heap buffers of `argv` / `env`,
/// which stay put for as long as this value lives.
struct PreparedExec {
    program: CString,
    #[allow(dead_code)] // owns the buffers behind `argv_ptrs`
    argv: Vec<CString>,
    env: Option<Vec<CString>>,
    argv_ptrs: Vec<*const c_char>,
    envp_ptrs: Option<Vec<*const c_char>>,
    search: bool,
    capture: Capture,
    failure_msg: Vec<u8>,
}

impl PreparedExec {
    fn from_spec(spec: &LaunchSpec) -> Result<Self> {
        let program_os = spec.program.as_os_str();
        if program_os.is_empty() {
            return Err(PlaneError::InvalidArgument("empty program name".to_string()));
        }
        let program = to_cstring(program_os, "program")?;

        let mut argv = Vec::with_capacity(spec.args.len() + 1);
        argv.push(match &spec.arg0 {
            Some(a0) => to_cstring(a0, "argv[0]")?,
            None => program.clone(),
        });
        for arg in &spec.args {
            argv.push(to_cstring(arg, "argument")?);
        }

        let env = match &spec.env {
            None => None,
            Some(vars) => {
                let mut out = Vec::with_capacity(vars.len());
                for (k, v) in vars {
                    if k.is_empty() || k.as_bytes().contains(&b'=') {
                        return Err(PlaneError::InvalidArgument(format!(
                            "invalid environment variable name {k:?}"
                        )));
                    }
                    let mut entry = k.as_bytes().to_vec();
                    entry.push(b'=');
                    entry.extend_from_slice(v.as_bytes());
                    out.push(CString::new(entry).map_err(|_| {
                        PlaneError::InvalidArgument(
                            "environment entry contains a NUL byte".to_string(),
                        )
                    })?);
                }
                Some(out)
            }
        };

        let mut failure_msg = b"Error exec()ing ".to_vec();
        failure_msg.extend_from_slice(program_os.as_bytes());
        failure_msg.extend_from_slice(b": ");

        let argv_ptrs = null_terminated(&argv);
        let envp_ptrs = env.as_deref().map(null_terminated);

        Ok(Self {
            program,
            argv,
            env,
            argv_ptrs,
            envp_ptrs,
            search: spec.program.is_search(),
            capture: spec.capture,
            failure_msg,
        })
    }
}

fn null_terminated(strings: &[CString]) -> Vec<*const c_char> {
    strings
        .iter()
        .map(|s| s.as_ptr())
        .chain(std::iter::once(ptr::null()))
        .collect()
}

fn to_cstring(s: &OsStr, what: &str) -> Result<CString> {
    CString::new(s.as_bytes())
        .map_err(|_| PlaneError::InvalidArgument(format!("{what} contains a NUL byte")))
}

/// Create the capture pipe, fork, and exec `spec` in the child.
///
/// Both pipe ends are created close-on-exec. The child `dup2`s the write end
/// onto stdout (and stderr for [`Capture::Combined`]); the duplicates have
/// the flag cleared, so exactly those survive exec. The read end never
/// reaches the new program.
pub(crate) fn launch_with_pipe(spec: &LaunchSpec) -> Result<Launched> {
    let prepared = PreparedExec::from_spec(spec)?;

    let (read_end, write_end) = pipe2(OFlag::O_CLOEXEC).map_err(PlaneError::Pipe)?;

    // SAFETY: the child branch only calls async-signal-safe functions on
    // data prepared above and never returns.
    let forked = unsafe { fork() };

    match forked {
        Err(errno) => {
            // Both ends are dropped (closed) on return.
            debug!(program = %spec.display_name(), error = %errno, "fork failed");
            Err(PlaneError::Fork(errno))
        }
        Ok(ForkResult::Child) => exec_child(&prepared, write_end.as_raw_fd()),
        Ok(ForkResult::Parent { child }) => {
            drop(write_end);
            info!(
                pid = %child,
                program = %spec.display_name(),
                search = prepared.search,
                explicit_env = prepared.env.is_some(),
                "spawned child process"
            );
            Ok(Launched {
                pid: child,
                output: read_end,
            })
        }
    }
}

/// Child side of the fork. Never returns.
fn exec_child(prepared: &PreparedExec, write_fd: RawFd) -> ! {
    if !redirect(write_fd, libc::STDOUT_FILENO)
        || (prepared.capture == Capture::Combined && !redirect(write_fd, libc::STDERR_FILENO))
    {
        // SAFETY: _exit is async-signal-safe.
        unsafe { libc::_exit(127) }
    }

    let program = prepared.program.as_ptr();
    let argv = prepared.argv_ptrs.as_ptr();
    // SAFETY: every pointer array is NULL-terminated and points into C
    // strings owned by `prepared`; exec* only returns on failure.
    unsafe {
        match (&prepared.envp_ptrs, prepared.search) {
            (None, false) => libc::execv(program, argv),
            (None, true) => libc::execvp(program, argv),
            (Some(envp), true) => libc::execvpe(program, argv, envp.as_ptr()),
            (Some(envp), false) => libc::execve(program, argv, envp.as_ptr()),
        };
    }

    report_exec_failure(&prepared.failure_msg, Errno::last());
    // SAFETY: _exit skips atexit handlers and stdio buffers inherited from
    // the parent.
    unsafe { libc::_exit(127) }
}

/// Make `target` refer to the pipe's write end and survive exec.
///
/// When the parent started with stdio closed, `pipe2` may already have
/// returned `target` itself; `dup2` is then a no-op that leaves
/// close-on-exec set, so the flag is cleared by hand.
fn redirect(write_fd: RawFd, target: RawFd) -> bool {
    // SAFETY: dup2 and fcntl are async-signal-safe and touch no memory.
    unsafe {
        if write_fd == target {
            libc::fcntl(target, libc::F_SETFD, 0) >= 0
        } else {
            libc::dup2(write_fd, target) >= 0
        }
    }
}

fn report_exec_failure(prefix: &[u8], errno: Errno) {
    let desc = errno.desc().as_bytes();
    for part in [prefix, desc, &b"\n"[..]] {
        // SAFETY: write(2) on fd 2 from valid slices; errors are ignored
        // because the child is about to exit anyway.
        unsafe {
            libc::write(
                libc::STDERR_FILENO,
                part.as_ptr().cast::<libc::c_void>(),
                part.len(),
            );
        }
    }
}
