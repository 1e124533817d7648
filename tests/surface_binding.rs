use std::sync::Arc;

use fdplane::plane::{Callbacks, FdPlaneOptions};
use fdplane::surface::{Compositor, ConsoleCompositor, Position, Surface, SurfaceOptions};
use fdplane::types::{FollowMode, ReadControl};

#[test]
fn test_bound_console_surfaces_nest_prefixes() {
    let compositor = ConsoleCompositor::with_root_prefix("root");
    let root = compositor.root();
    assert!(!root.is_scrolling());

    let child = compositor.bind_console(&SurfaceOptions {
        name: Some("job".to_string()),
        ..SurfaceOptions::default()
    });
    assert_eq!(child.prefix(), Some("root/job"));

    let bound: Arc<dyn Surface> = compositor
        .bind_surface(&root, Position { y: 1, x: 0 }, &SurfaceOptions::default())
        .unwrap();
    assert!(!bound.set_scrolling(true));
    assert!(bound.is_scrolling());
}

#[test]
fn test_options_and_callbacks_builders() {
    let options = FdPlaneOptions::default()
        .follow(true)
        .chunk_size(16)
        .with_context(String::from("ctx"));
    assert_eq!(options.context, "ctx");
    assert_eq!(options.chunk_size, 16);
    assert!(options.follow.is_enabled());
    assert_eq!(FollowMode::from(false), FollowMode::Off);

    let partial = Callbacks::<()>::new().on_data(|_, _, _| ReadControl::Continue);
    assert!(!partial.is_complete());
    let full = partial.on_done(|_, _, _| {});
    assert!(full.is_complete());
    assert!(full.validate().is_ok());
}
