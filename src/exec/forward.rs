// src/exec/forward.rs

use anyhow::{Context, Result};
use regex::Regex;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::PlaneError;
use crate::plane::{Callbacks, PlaneRef};
use crate::surface::ConsoleSurface;
use crate::types::{DoneReason, ReadControl};

/// Bounded so a slow terminal applies back-pressure to the reader thread.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Partial lines longer than this are dropped from the matcher.
const MAX_PENDING_LINE: usize = 64 * 1024;

/// What a reader thread reports to the async side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaneEvent {
    Chunk(Vec<u8>),
    /// A line matched the stop pattern; no further chunks follow.
    Matched(String),
    Done(DoneReason),
}

/// Per-plane context owned by the reader thread.
#[derive(Debug)]
pub struct ForwardContext {
    tx: mpsc::Sender<PlaneEvent>,
    matcher: Option<LineMatcher>,
}

impl ForwardContext {
    pub fn new(tx: mpsc::Sender<PlaneEvent>, matcher: Option<LineMatcher>) -> Self {
        Self { tx, matcher }
    }
}

/// Callbacks that forward every chunk and the final reason over the
/// context's channel.
///
/// The reader stops when the receiver is gone or a stop-pattern line shows
/// up. A trailing line without a newline is still checked at EOF.
pub fn forwarding_callbacks() -> Callbacks<ForwardContext> {
    Callbacks::new()
        .on_data(|plane: &PlaneRef, chunk: &[u8], ctx: &mut ForwardContext| {
            if ctx.tx.blocking_send(PlaneEvent::Chunk(chunk.to_vec())).is_err() {
                debug!(fd = plane.raw_fd(), "event receiver gone; stopping reader");
                return ReadControl::Stop;
            }
            match ctx.matcher.as_mut().and_then(|m| m.feed(chunk)) {
                Some(line) => {
                    let _ = ctx.tx.blocking_send(PlaneEvent::Matched(line));
                    ReadControl::Stop
                }
                None => ReadControl::Continue,
            }
        })
        .on_done(|plane: &PlaneRef, reason: DoneReason, ctx: &mut ForwardContext| {
            if reason == DoneReason::Eof {
                if let Some(line) = ctx.matcher.as_mut().and_then(LineMatcher::finish) {
                    let _ = ctx.tx.blocking_send(PlaneEvent::Matched(line));
                }
            }
            debug!(fd = plane.raw_fd(), ?reason, "forwarding done event");
            let _ = ctx.tx.blocking_send(PlaneEvent::Done(reason));
        })
}

/// Compile a `--stop-on` pattern.
pub fn compile_stop_pattern(pattern: Option<&str>) -> Result<Option<LineMatcher>> {
    pattern
        .map(|p| {
            Regex::new(p)
                .map(LineMatcher::new)
                .with_context(|| format!("invalid --stop-on regex '{p}'"))
        })
        .transpose()
}

/// Line-oriented regex matcher over a byte stream split at arbitrary
/// chunk boundaries.
#[derive(Debug)]
pub struct LineMatcher {
    regex: Regex,
    pending: Vec<u8>,
}

impl LineMatcher {
    pub fn new(regex: Regex) -> Self {
        Self {
            regex,
            pending: Vec::new(),
        }
    }

    /// Feed one chunk; returns the first complete line that matches.
    ///
    /// Lines after a match in the same chunk are discarded.
    pub fn feed(&mut self, chunk: &[u8]) -> Option<String> {
        self.pending.extend_from_slice(chunk);

        let mut start = 0;
        let mut found = None;
        while let Some(pos) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let raw = String::from_utf8_lossy(&self.pending[start..start + pos]);
            let line = raw.trim_end_matches('\r');
            start += pos + 1;
            if self.regex.is_match(line) {
                found = Some(line.to_string());
                break;
            }
        }

        if found.is_some() {
            self.pending.clear();
        } else {
            self.pending.drain(..start);
            if self.pending.len() > MAX_PENDING_LINE {
                self.pending.clear();
            }
        }
        found
    }

    /// Check the unterminated tail left at end-of-stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        self.regex.is_match(&line).then_some(line)
    }
}

/// How the event pump ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpOutcome {
    Done(DoneReason),
    Matched(String),
    Interrupted,
    /// The reader went away without a `Done` event.
    Disconnected,
}

/// Print chunks to `console` until the plane reports completion or Ctrl-C
/// arrives.
pub async fn pump_events(
    rx: &mut mpsc::Receiver<PlaneEvent>,
    console: &ConsoleSurface,
) -> Result<PumpOutcome> {
    let mut matched = None;
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(PlaneEvent::Chunk(bytes)) => {
                    console.write_chunk(&bytes).context("failed to write output")?;
                }
                Some(PlaneEvent::Matched(line)) => {
                    info!(%line, "stop pattern matched");
                    matched = Some(line);
                }
                Some(PlaneEvent::Done(reason)) => {
                    return Ok(match matched {
                        Some(line) => PumpOutcome::Matched(line),
                        None => PumpOutcome::Done(reason),
                    });
                }
                None => return Ok(PumpOutcome::Disconnected),
            },
            res = tokio::signal::ctrl_c() => {
                res.context("failed to listen for Ctrl+C")?;
                info!("Ctrl-C received; tearing down");
                return Ok(PumpOutcome::Interrupted);
            }
        }
    }
}

/// Drop the event receiver, then run `teardown` on the blocking pool.
///
/// A reader parked in `blocking_send` on a full channel only gets back to
/// `poll` once the receiver is gone, so the receiver must be dropped before
/// anything joins the reader.
pub async fn teardown_blocking<T, F>(rx: mpsc::Receiver<PlaneEvent>, teardown: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> std::result::Result<T, PlaneError> + Send + 'static,
{
    drop(rx);
    let out = tokio::task::spawn_blocking(teardown)
        .await
        .context("teardown task failed")??;
    Ok(out)
}
