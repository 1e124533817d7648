// src/plane/options.rs

use crate::errors::{PlaneError, Result};
use crate::plane::PlaneRef;
use crate::types::{DEFAULT_CHUNK_SIZE, DoneReason, FollowMode, ReadControl};

/// Data callback: called once per chunk, in order, on the reader thread.
pub type DataFn<C> = dyn FnMut(&PlaneRef, &[u8], &mut C) -> ReadControl + Send;

/// Completion callback: called at most once, after the last `on_data`.
pub type DoneFn<C> = dyn FnOnce(&PlaneRef, DoneReason, &mut C) + Send;

/// Options for [`FdPlane::create`](crate::plane::FdPlane::create).
///
/// `context` is owned by the reader thread once the plane is created and is
/// passed as `&mut C` to every callback.
#[derive(Debug, Clone)]
pub struct FdPlaneOptions<C> {
    pub follow: FollowMode,
    pub chunk_size: usize,
    pub context: C,
}

impl<C> FdPlaneOptions<C> {
    pub fn new(context: C) -> Self {
        Self {
            follow: FollowMode::Off,
            chunk_size: DEFAULT_CHUNK_SIZE,
            context,
        }
    }

    pub fn follow(mut self, follow: impl Into<FollowMode>) -> Self {
        self.follow = follow.into();
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Swap the context, keeping the other settings.
    pub fn with_context<D>(self, context: D) -> FdPlaneOptions<D> {
        FdPlaneOptions {
            follow: self.follow,
            chunk_size: self.chunk_size,
            context,
        }
    }
}

impl Default for FdPlaneOptions<()> {
    fn default() -> Self {
        Self::new(())
    }
}

/// The `on_data` / `on_done` pair.
///
/// Both are required; creating a plane with either unset fails with
/// [`PlaneError::MissingCallback`].
pub struct Callbacks<C> {
    on_data: Option<Box<DataFn<C>>>,
    on_done: Option<Box<DoneFn<C>>>,
}

impl<C> Callbacks<C> {
    pub fn new() -> Self {
        Self {
            on_data: None,
            on_done: None,
        }
    }

    pub fn on_data<F>(mut self, f: F) -> Self
    where
        F: FnMut(&PlaneRef, &[u8], &mut C) -> ReadControl + Send + 'static,
    {
        self.on_data = Some(Box::new(f));
        self
    }

    pub fn on_done<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&PlaneRef, DoneReason, &mut C) + Send + 'static,
    {
        self.on_done = Some(Box::new(f));
        self
    }

    pub fn is_complete(&self) -> bool {
        self.on_data.is_some() && self.on_done.is_some()
    }

    /// Fails with [`PlaneError::MissingCallback`] naming the first unset
    /// callback.
    pub fn validate(&self) -> Result<()> {
        if self.on_data.is_none() {
            return Err(PlaneError::MissingCallback("on_data"));
        }
        if self.on_done.is_none() {
            return Err(PlaneError::MissingCallback("on_done"));
        }
        Ok(())
    }

    pub(crate) fn into_parts(self) -> Result<(Box<DataFn<C>>, Box<DoneFn<C>>)> {
        let on_data = self.on_data.ok_or(PlaneError::MissingCallback("on_data"))?;
        let on_done = self.on_done.ok_or(PlaneError::MissingCallback("on_done"))?;
        Ok((on_data, on_done))
    }
}

impl<C> Default for Callbacks<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for Callbacks<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_data", &self.on_data.is_some())
            .field("on_done", &self.on_done.is_some())
            .finish()
    }
}
