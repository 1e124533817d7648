// src/exec/tail.rs

use std::fs::File;
use std::os::fd::{AsFd, OwnedFd};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::TailArgs;
use crate::config::model::ConfigFile;
use crate::exec::forward::{
    EVENT_CHANNEL_CAPACITY, ForwardContext, PumpOutcome, compile_stop_pattern,
    forwarding_callbacks, pump_events, teardown_blocking,
};
use crate::plane::FdPlane;
use crate::surface::{ConsoleCompositor, Surface, SurfaceOptions};

/// Exit code after Ctrl-C, as a shell reports SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// `fdplane tail`: stream a file (or stdin for `-`) to stdout.
pub async fn tail_file(cfg: &ConfigFile, args: TailArgs) -> Result<i32> {
    let fd = open_input(&args.file)?;

    let mut cfg = cfg.clone();
    if args.follow {
        cfg.reader.follow = true;
    }

    let matcher = compile_stop_pattern(args.stop_on.as_deref())?;
    let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let options = cfg.reader_options(ForwardContext::new(tx, matcher))?;

    let console = ConsoleCompositor::new().bind_console(&SurfaceOptions {
        name: args.prefix,
        ..SurfaceOptions::default()
    });
    let surface: Arc<dyn Surface> = console.clone();

    let plane = FdPlane::create(surface, options, fd, forwarding_callbacks())
        .with_context(|| format!("failed to read {}", args.file))?;
    info!(file = %args.file, fd = plane.raw_fd(), follow = cfg.reader.follow, "tailing");

    let pumped = pump_events(&mut rx, &console).await;
    teardown_blocking(rx, move || plane.destroy()).await?;
    let outcome = pumped?;

    let code = match outcome {
        PumpOutcome::Done(reason) if reason.is_success() => 0,
        PumpOutcome::Done(reason) => {
            warn!(file = %args.file, ?reason, "reading failed");
            1
        }
        PumpOutcome::Matched(_) => 0,
        PumpOutcome::Interrupted => INTERRUPTED_EXIT_CODE,
        PumpOutcome::Disconnected => 1,
    };
    Ok(code)
}

fn open_input(path: &str) -> Result<OwnedFd> {
    if path == "-" {
        // A duplicate, so the plane closing it leaves fd 0 alone.
        return std::io::stdin()
            .as_fd()
            .try_clone_to_owned()
            .context("failed to duplicate stdin");
    }
    let file = File::open(path).with_context(|| format!("failed to open {path}"))?;
    Ok(OwnedFd::from(file))
}
