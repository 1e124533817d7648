mod common;

use std::fs::OpenOptions;
use std::io::Write;
use std::time::Duration;

use common::{dyn_surface, init_tracing, surface};
use fdplane::plane::{FdPlane, FdPlaneOptions};
use fdplane::types::{DoneReason, FollowMode};
use fdplane_test_utils::recorder::{Event, recording_callbacks};
use tempfile::NamedTempFile;

fn follow_fast() -> FollowMode {
    FollowMode::On {
        interval: Duration::from_millis(20),
    }
}

#[test]
fn test_follow_picks_up_appended_data() {
    init_tracing();
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), b"one\n").unwrap();

    let fd = std::fs::File::open(file.path()).unwrap().into();
    let (callbacks, log) = recording_callbacks::<()>();
    let options = FdPlaneOptions::default().follow(follow_fast());
    let plane = FdPlane::create(dyn_surface(&surface()), options, fd, callbacks).unwrap();

    assert_eq!(log.wait_data(b"one\n"), b"one\n");
    // EOF is not terminal while following.
    log.assert_quiet(Duration::from_millis(100));

    let mut appender = OpenOptions::new().append(true).open(file.path()).unwrap();
    appender.write_all(b"two\n").unwrap();
    appender.flush().unwrap();

    assert_eq!(log.wait_data(b"two\n"), b"two\n");

    plane.destroy().unwrap();
    assert_eq!(log.next(Duration::from_secs(5)), Some(Event::Done(DoneReason::Cancelled)));
}

#[test]
fn test_destroy_interrupts_follow_sleep() {
    let file = NamedTempFile::new().unwrap();
    let fd = std::fs::File::open(file.path()).unwrap().into();
    let (callbacks, log) = recording_callbacks::<()>();
    let options = FdPlaneOptions::default().follow(FollowMode::On {
        interval: Duration::from_secs(60),
    });
    let plane = FdPlane::create(dyn_surface(&surface()), options, fd, callbacks).unwrap();

    std::thread::sleep(Duration::from_millis(50));
    let started = std::time::Instant::now();
    plane.destroy().unwrap();
    assert!(started.elapsed() < Duration::from_secs(5), "destroy waited out the interval");
    assert_eq!(log.next(Duration::from_secs(5)), Some(Event::Done(DoneReason::Cancelled)));
}

#[test]
fn test_regular_file_without_follow_ends_at_eof() {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), b"contents").unwrap();

    let fd = std::fs::File::open(file.path()).unwrap().into();
    let (callbacks, log) = recording_callbacks::<()>();
    let _plane =
        FdPlane::create(dyn_surface(&surface()), FdPlaneOptions::default(), fd, callbacks)
            .unwrap();

    let (data, reason) = log.wait_done();
    assert_eq!(data, b"contents");
    assert_eq!(reason, DoneReason::Eof);
}
