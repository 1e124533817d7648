use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use fdplane::surface::Surface;

/// Surface that only records what the plane did to it.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    scrolling: AtomicBool,
    scroll_calls: AtomicUsize,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set_scrolling` calls so far.
    pub fn scroll_calls(&self) -> usize {
        self.scroll_calls.load(Ordering::SeqCst)
    }
}

impl Surface for RecordingSurface {
    fn set_scrolling(&self, enabled: bool) -> bool {
        self.scroll_calls.fetch_add(1, Ordering::SeqCst);
        self.scrolling.swap(enabled, Ordering::SeqCst)
    }

    fn is_scrolling(&self) -> bool {
        self.scrolling.load(Ordering::SeqCst)
    }
}
