use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use fdplane::plane::{Callbacks, PlaneRef};
use fdplane::types::{DoneReason, ReadControl};

/// Default wait used by the helpers below.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// One callback invocation, as seen from the test thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Data(Vec<u8>),
    Done(DoneReason),
}

/// Receiving side of [`recording_callbacks`].
pub struct EventLog {
    rx: Receiver<Event>,
}

/// Callbacks that record every `on_data` / `on_done` call and always
/// continue reading.
pub fn recording_callbacks<C: 'static>() -> (Callbacks<C>, EventLog) {
    recording_callbacks_with(|_, _, _| ReadControl::Continue)
}

/// Like [`recording_callbacks`], with `decide` choosing the return value of
/// each `on_data` call after it has been recorded.
pub fn recording_callbacks_with<C, F>(mut decide: F) -> (Callbacks<C>, EventLog)
where
    C: 'static,
    F: FnMut(&PlaneRef, &[u8], &mut C) -> ReadControl + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let done_tx: Sender<Event> = tx.clone();

    let callbacks = Callbacks::new()
        .on_data(move |plane: &PlaneRef, chunk: &[u8], ctx: &mut C| {
            let _ = tx.send(Event::Data(chunk.to_vec()));
            decide(plane, chunk, ctx)
        })
        .on_done(move |_plane: &PlaneRef, reason: DoneReason, _ctx: &mut C| {
            let _ = done_tx.send(Event::Done(reason));
        });

    (callbacks, EventLog { rx })
}

impl EventLog {
    pub fn from_receiver(rx: Receiver<Event>) -> Self {
        Self { rx }
    }

    /// Next event, or `None` after `timeout`.
    pub fn next(&self, timeout: Duration) -> Option<Event> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Collect data until `Done`; panics if it does not arrive in time.
    pub fn wait_done(&self) -> (Vec<u8>, DoneReason) {
        let deadline = Instant::now() + EVENT_TIMEOUT;
        let mut data = Vec::new();
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(left) {
                Ok(Event::Data(chunk)) => data.extend_from_slice(&chunk),
                Ok(Event::Done(reason)) => return (data, reason),
                Err(RecvTimeoutError::Timeout) => panic!("no Done event within {EVENT_TIMEOUT:?}"),
                Err(RecvTimeoutError::Disconnected) => panic!("callbacks dropped without Done"),
            }
        }
    }

    /// Collect data until at least `expected.len()` bytes have arrived.
    pub fn wait_data(&self, expected: &[u8]) -> Vec<u8> {
        let deadline = Instant::now() + EVENT_TIMEOUT;
        let mut data = Vec::new();
        while data.len() < expected.len() {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(left) {
                Ok(Event::Data(chunk)) => data.extend_from_slice(&chunk),
                Ok(Event::Done(reason)) => panic!("unexpected Done({reason:?}) after {data:?}"),
                Err(e) => panic!("waiting for {expected:?}, got {data:?}: {e}"),
            }
        }
        data
    }

    /// Assert nothing arrives for `quiet`.
    pub fn assert_quiet(&self, quiet: Duration) {
        if let Ok(event) = self.rx.recv_timeout(quiet) {
            panic!("unexpected event {event:?}");
        }
    }

    /// True once the callbacks (and with them the reader) are gone and
    /// every event has been drained.
    pub fn is_closed(&self) -> bool {
        matches!(
            self.rx.recv_timeout(EVENT_TIMEOUT),
            Err(RecvTimeoutError::Disconnected)
        )
    }
}
