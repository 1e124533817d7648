// src/surface/mod.rs

//! Drawing-surface collaborator.
//!
//! The rendering engine that owns surfaces lives outside this crate. FdPlane
//! only needs two things from it:
//! - [`Compositor::bind_surface`] to obtain a child surface, and
//! - [`Surface::set_scrolling`] to switch that surface into scrolling mode.
//!
//! Surfaces are always passed explicitly as `Arc<dyn Surface>`; the plane
//! never frees or replaces them.

pub mod console;

use std::sync::Arc;

use crate::errors::Result;

pub use console::{ConsoleCompositor, ConsoleSurface};

/// Externally-owned rendering target.
pub trait Surface: Send + Sync {
    /// Enable or disable scrolling. Returns the previous setting.
    fn set_scrolling(&self, enabled: bool) -> bool;

    fn is_scrolling(&self) -> bool;
}

/// Cell position of a bound surface relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub y: i32,
    pub x: i32,
}

/// Geometry requested when binding a new surface.
#[derive(Debug, Clone, Default)]
pub struct SurfaceOptions {
    pub rows: u16,
    pub cols: u16,
    pub name: Option<String>,
}

/// Owner of surfaces; hands out children bound to a parent.
pub trait Compositor {
    fn bind_surface(
        &self,
        parent: &Arc<dyn Surface>,
        position: Position,
        options: &SurfaceOptions,
    ) -> Result<Arc<dyn Surface>>;
}
