// src/exec/run.rs

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::config::model::ConfigFile;
use crate::exec::forward::{
    EVENT_CHANNEL_CAPACITY, ForwardContext, PumpOutcome, compile_stop_pattern,
    forwarding_callbacks, pump_events, teardown_blocking,
};
use crate::subproc::{LaunchSpec, Subprocess, SubprocessOptions};
use crate::surface::{ConsoleCompositor, Surface, SurfaceOptions};
use crate::types::{Capture, DoneReason};

/// `fdplane run`: spawn the program, stream its output, return the exit
/// code the shell would report for it.
pub async fn run_command(cfg: &ConfigFile, args: RunArgs) -> Result<i32> {
    let mut argv = args.command.into_iter();
    let program = argv.next().context("no program given")?;

    let capture = if args.stdout_only {
        Capture::Stdout
    } else {
        cfg.subprocess.capture
    };

    let mut spec = if args.path {
        LaunchSpec::path(&program)
    } else {
        LaunchSpec::search(&program)
    };
    spec = spec.args(argv).capture(capture);
    if !args.env.is_empty() {
        spec = spec.env_clear().envs(args.env);
    }

    let exit_timeout = cfg.exit_timeout()?;
    let matcher = compile_stop_pattern(args.stop_on.as_deref())?;
    let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let options = SubprocessOptions::new(cfg.reader_options(ForwardContext::new(tx, matcher))?)
        .teardown(cfg.teardown_policy()?);

    let console = ConsoleCompositor::new().bind_console(&SurfaceOptions {
        name: args.prefix,
        ..SurfaceOptions::default()
    });
    let surface: Arc<dyn Surface> = console.clone();

    let mut child = Subprocess::spawn(surface, options, spec, forwarding_callbacks())
        .with_context(|| format!("failed to run {program}"))?;

    // Teardown runs even when pumping fails, so the receiver is always
    // dropped before the reader is joined.
    let pumped = pump_events(&mut rx, &console).await;
    let pid = child.pid();

    // Output ended on its own: the child is most likely exiting, so give it
    // `exit_timeout` to report its real status before signalling it.
    let natural_end = matches!(
        pumped,
        Ok(PumpOutcome::Done(DoneReason::Eof | DoneReason::ReadError(_)))
    );
    if let Ok(PumpOutcome::Done(DoneReason::ReadError(errno))) = &pumped {
        warn!(%pid, error = %errno, "reading child output failed");
    }

    let status = teardown_blocking(rx, move || {
        if natural_end && child.wait_timeout(exit_timeout)?.is_none() {
            warn!(%pid, timeout = ?exit_timeout, "child still running after its output closed; tearing it down");
        }
        child.destroy()
    })
    .await?;
    let outcome = pumped?;

    info!(%pid, program = %program, ?status, ?outcome, "run finished");
    Ok(status.shell_code())
}
