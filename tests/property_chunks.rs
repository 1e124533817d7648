mod common;

use std::io::Write;

use common::{dyn_surface, pipe_pair, surface};
use fdplane::plane::{FdPlane, FdPlaneOptions};
use fdplane::types::DoneReason;
use fdplane_test_utils::recorder::{Event, recording_callbacks};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Whatever the chunk size and however the writer splits its output, the
    /// callbacks see the exact byte stream, in order, in bounded non-empty
    /// chunks, followed by exactly one `Eof`.
    #[test]
    fn prop_byte_stream_is_preserved(
        writes in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 1..512), 0..16),
        chunk_size in 1usize..1024,
    ) {
        let (read, mut write) = pipe_pair();
        let (callbacks, log) = recording_callbacks::<()>();
        let options = FdPlaneOptions::default().chunk_size(chunk_size);
        let plane = FdPlane::create(dyn_surface(&surface()), options, read, callbacks).unwrap();

        let expected: Vec<u8> = writes.concat();
        let writer = std::thread::spawn(move || {
            for w in &writes {
                write.write_all(w).unwrap();
            }
        });

        let mut seen = Vec::new();
        let reason = loop {
            match log.next(std::time::Duration::from_secs(5)).expect("event") {
                Event::Data(chunk) => {
                    prop_assert!(!chunk.is_empty());
                    prop_assert!(chunk.len() <= chunk_size);
                    seen.extend(chunk);
                }
                Event::Done(reason) => break reason,
            }
        };
        writer.join().unwrap();

        prop_assert_eq!(reason, DoneReason::Eof);
        prop_assert_eq!(seen, expected);
        prop_assert!(log.is_closed());
        plane.destroy().unwrap();
    }
}
