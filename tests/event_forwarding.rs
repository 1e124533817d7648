mod common;

use std::time::Duration;

use common::{dyn_surface, surface};
use fdplane::exec::forward::EVENT_CHANNEL_CAPACITY;
use fdplane::exec::{ForwardContext, PlaneEvent, forwarding_callbacks, teardown_blocking};
use fdplane::plane::{FdPlane, FdPlaneOptions};
use fdplane::subproc::{Subprocess, SubprocessOptions};
use fdplane::types::{DoneReason, ExitStatus};
use fdplane_test_utils::builders::{fast_teardown, pipe_pair};
use fdplane_test_utils::with_timeout;
use nix::sys::signal::Signal;
use tokio::sync::mpsc;

#[tokio::test]
async fn test_teardown_with_full_undrained_channel_completes() {
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let options = SubprocessOptions::new(FdPlaneOptions::new(ForwardContext::new(tx, None)))
        .teardown(fast_teardown());

    // `yes` fills the channel almost at once; the reader then parks in
    // `blocking_send` inside `on_data`.
    let child = Subprocess::spawn_vp(
        dyn_surface(&surface()),
        options,
        "yes",
        Vec::<&str>::new(),
        forwarding_callbacks(),
    )
    .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let status = with_timeout(teardown_blocking(rx, move || child.destroy()))
        .await
        .expect("teardown");
    assert_eq!(status, ExitStatus::Signaled(Signal::SIGTERM));
}

#[tokio::test]
async fn test_plane_teardown_with_full_undrained_channel_completes() {
    let (read, mut write) = pipe_pair();
    let writer = std::thread::spawn(move || {
        use std::io::Write;
        let block = [b'x'; 4096];
        // Ends with EPIPE once the plane closes the read end.
        while write.write_all(&block).is_ok() {}
    });

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let options = FdPlaneOptions::new(ForwardContext::new(tx, None)).chunk_size(16);
    let plane =
        FdPlane::create(dyn_surface(&surface()), options, read, forwarding_callbacks()).unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    with_timeout(teardown_blocking(rx, move || plane.destroy()))
        .await
        .expect("teardown");
    writer.join().unwrap();
}

#[tokio::test]
async fn test_events_arrive_in_order_then_done() {
    let (read, mut write) = pipe_pair();
    let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let plane = FdPlane::create(
        dyn_surface(&surface()),
        FdPlaneOptions::new(ForwardContext::new(tx, None)),
        read,
        forwarding_callbacks(),
    )
    .unwrap();

    std::io::Write::write_all(&mut write, b"abc").unwrap();
    drop(write);

    let mut data = Vec::new();
    let reason = with_timeout(async {
        loop {
            match rx.recv().await.expect("event") {
                PlaneEvent::Chunk(bytes) => data.extend(bytes),
                PlaneEvent::Done(reason) => break reason,
                PlaneEvent::Matched(line) => panic!("unexpected match {line}"),
            }
        }
    })
    .await;
    assert_eq!(data, b"abc");
    assert_eq!(reason, DoneReason::Eof);

    with_timeout(teardown_blocking(rx, move || plane.destroy()))
        .await
        .unwrap();
}
