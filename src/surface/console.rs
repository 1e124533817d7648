// src/surface/console.rs

//! Minimal stdout-backed surface used by the `fdplane` binary.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::Result;
use crate::surface::{Compositor, Position, Surface, SurfaceOptions};

/// A surface that appends text to stdout.
///
/// With scrolling enabled every chunk is written as-is. With scrolling
/// disabled a line prefix (if any) is still applied, but output is flushed
/// only on newlines. Bound children inherit the parent's prefix and append
/// their own name.
#[derive(Debug)]
pub struct ConsoleSurface {
    prefix: Option<String>,
    scrolling: AtomicBool,
    at_line_start: AtomicBool,
}

impl ConsoleSurface {
    pub fn new() -> Self {
        Self {
            prefix: None,
            scrolling: AtomicBool::new(false),
            at_line_start: AtomicBool::new(true),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Self::new()
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Write a chunk of captured output, prefixing each new line.
    pub fn write_chunk(&self, chunk: &[u8]) -> io::Result<()> {
        let mut out = io::stdout().lock();
        match &self.prefix {
            None => out.write_all(chunk)?,
            Some(prefix) => {
                for piece in chunk.split_inclusive(|b| *b == b'\n') {
                    if self.at_line_start.load(Ordering::Relaxed) {
                        write!(out, "[{prefix}] ")?;
                    }
                    out.write_all(piece)?;
                    self.at_line_start
                        .store(piece.ends_with(b"\n"), Ordering::Relaxed);
                }
            }
        }

        if self.is_scrolling() || chunk.contains(&b'\n') {
            out.flush()?;
        }
        Ok(())
    }
}

impl Default for ConsoleSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for ConsoleSurface {
    fn set_scrolling(&self, enabled: bool) -> bool {
        self.scrolling.swap(enabled, Ordering::AcqRel)
    }

    fn is_scrolling(&self) -> bool {
        self.scrolling.load(Ordering::Acquire)
    }
}

/// Compositor that hands out [`ConsoleSurface`]s.
///
/// Positions are ignored; a console has a single column of text.
#[derive(Debug, Default, Clone)]
pub struct ConsoleCompositor {
    root_prefix: Option<String>,
}

impl ConsoleCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root_prefix(prefix: impl Into<String>) -> Self {
        Self {
            root_prefix: Some(prefix.into()),
        }
    }

    pub fn root(&self) -> Arc<dyn Surface> {
        match &self.root_prefix {
            Some(p) => Arc::new(ConsoleSurface::with_prefix(p.clone())),
            None => Arc::new(ConsoleSurface::new()),
        }
    }

    /// Bind a concrete console child so callers can write to it directly.
    pub fn bind_console(&self, options: &SurfaceOptions) -> Arc<ConsoleSurface> {
        let prefix = match (&self.root_prefix, &options.name) {
            (Some(root), Some(name)) => Some(format!("{root}/{name}")),
            (Some(root), None) => Some(root.clone()),
            (None, Some(name)) => Some(name.clone()),
            (None, None) => None,
        };
        Arc::new(match prefix {
            Some(p) => ConsoleSurface::with_prefix(p),
            None => ConsoleSurface::new(),
        })
    }
}

impl Compositor for ConsoleCompositor {
    fn bind_surface(
        &self,
        _parent: &Arc<dyn Surface>,
        _position: Position,
        options: &SurfaceOptions,
    ) -> Result<Arc<dyn Surface>> {
        let child: Arc<dyn Surface> = self.bind_console(options);
        Ok(child)
    }
}
