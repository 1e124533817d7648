mod common;

use std::io::Write;
use std::sync::{Arc, Mutex, mpsc};
use std::time::{Duration, Instant};

use common::{dyn_surface, init_tracing, pipe_pair, surface, wait_for_reader_closed};
use fdplane::plane::{Callbacks, FdPlane, FdPlaneOptions, PlaneRef};
use fdplane::types::{DestroyOutcome, DestroyState, DoneReason, ReadControl};
use fdplane_test_utils::recorder::{Event, recording_callbacks, recording_callbacks_with};
use nix::errno::Errno;

fn wait_finished(plane: &FdPlane) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !plane.is_finished() {
        assert!(Instant::now() < deadline, "reader thread did not exit");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_external_destroy_cancels_idle_reader() {
    init_tracing();
    let (read, mut write) = pipe_pair();
    let (callbacks, log) = recording_callbacks::<()>();

    let plane =
        FdPlane::create(dyn_surface(&surface()), FdPlaneOptions::default(), read, callbacks)
            .unwrap();
    assert_eq!(plane.state(), DestroyState::Active);
    assert!(!plane.is_reader_thread());

    std::thread::sleep(Duration::from_millis(50));
    plane.destroy().expect("destroy idle plane");

    let (data, reason) = log.wait_done();
    assert!(data.is_empty());
    assert_eq!(reason, DoneReason::Cancelled);
    assert_eq!(reason.code(), Errno::ECANCELED as i32);

    assert!(wait_for_reader_closed(&mut write), "fd should be closed after destroy");
}

#[test]
fn test_drop_destroys_plane() {
    let (read, mut write) = pipe_pair();
    let (callbacks, log) = recording_callbacks::<()>();

    let plane =
        FdPlane::create(dyn_surface(&surface()), FdPlaneOptions::default(), read, callbacks)
            .unwrap();
    drop(plane);

    assert_eq!(log.next(Duration::from_secs(5)), Some(Event::Done(DoneReason::Cancelled)));
    assert!(wait_for_reader_closed(&mut write));
}

#[test]
fn test_self_destroy_through_plane_ref() {
    init_tracing();
    let (read, mut write) = pipe_pair();
    let (outcome_tx, outcome_rx) = mpsc::channel();

    let (callbacks, log) = recording_callbacks_with::<(), _>(move |plane, _, _| {
        let first = plane.destroy();
        let second = plane.destroy();
        outcome_tx.send((first, second)).unwrap();
        ReadControl::Continue
    });

    let plane =
        FdPlane::create(dyn_surface(&surface()), FdPlaneOptions::default(), read, callbacks)
            .unwrap();

    write.write_all(b"bye").unwrap();

    let (first, second) = outcome_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(first, DestroyOutcome::Deferred);
    assert_eq!(second, DestroyOutcome::AlreadyRequested);

    let (data, reason) = log.wait_done();
    assert_eq!(data, b"bye");
    assert_eq!(reason, DoneReason::Stopped);

    wait_finished(&plane);
    assert_eq!(plane.state(), DestroyState::Destroyed);
    assert!(wait_for_reader_closed(&mut write));

    // The reader already closed the fd; an external destroy is a no-op.
    plane.destroy().expect("destroy after self-destroy");
}

#[test]
fn test_self_destroy_of_owned_handle_does_not_deadlock() {
    init_tracing();
    let (read, mut write) = pipe_pair();
    let slot: Arc<Mutex<Option<FdPlane>>> = Arc::new(Mutex::new(None));
    let (result_tx, result_rx) = mpsc::channel();

    let (callbacks, log) = recording_callbacks_with(
        move |_: &PlaneRef, _: &[u8], slot: &mut Arc<Mutex<Option<FdPlane>>>| {
            let owned = slot.lock().unwrap().take();
            if let Some(plane) = owned {
                assert!(plane.is_reader_thread());
                result_tx.send(plane.destroy().is_ok()).unwrap();
            }
            ReadControl::Continue
        },
    );

    let plane = FdPlane::create(
        dyn_surface(&surface()),
        FdPlaneOptions::new(Arc::clone(&slot)),
        read,
        callbacks,
    )
    .unwrap();
    *slot.lock().unwrap() = Some(plane);

    write.write_all(b"x").unwrap();

    assert_eq!(result_rx.recv_timeout(Duration::from_secs(5)), Ok(true));
    let (_, reason) = log.wait_done();
    assert_eq!(reason, DoneReason::Stopped);
    assert!(wait_for_reader_closed(&mut write));
    assert!(log.is_closed());
}

#[test]
fn test_destroy_requested_from_done_callback() {
    let (read, mut write) = pipe_pair();
    let (tx, rx) = mpsc::channel();

    let callbacks = Callbacks::<()>::new()
        .on_data(|_, _, _| ReadControl::Continue)
        .on_done(move |plane: &PlaneRef, reason: DoneReason, _: &mut ()| {
            tx.send((reason, plane.destroy())).unwrap();
        });

    let plane =
        FdPlane::create(dyn_surface(&surface()), FdPlaneOptions::default(), read, callbacks)
            .unwrap();

    write.write_all(b"payload").unwrap();
    drop(write);

    let (reason, outcome) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(reason, DoneReason::Eof);
    assert_eq!(outcome, DestroyOutcome::Deferred);

    wait_finished(&plane);
    assert_eq!(plane.state(), DestroyState::Destroyed);
    plane.destroy().expect("destroy after deferred close");
}
