#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::Arc;

use fdplane::surface::Surface;
use fdplane_test_utils::RecordingSurface;

pub use fdplane_test_utils::builders::{pipe_pair, surface, wait_for_reader_closed};
pub use fdplane_test_utils::init_tracing;

/// Upcast for APIs taking `Arc<dyn Surface>` while the test keeps the
/// concrete handle.
pub fn dyn_surface(surface: &Arc<RecordingSurface>) -> Arc<dyn Surface> {
    surface.clone()
}
