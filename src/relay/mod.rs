//! Terminal-stream relay pipeline.
//!
//! The relay turns a child process's continuously-redrawn terminal output
//! into chat messages: an ingest buffer captures raw chunks, a periodic
//! tick drains and filters them, a bounded rolling transcript produces a
//! display window for in-place edits, and an idle check finalizes the turn
//! into durable, size-bounded chunks.

mod finalize;
mod ingest;
mod sink;
mod stream;
mod transcript;

pub use finalize::{IDLE_THRESHOLD, MAX_FINAL_CHUNKS};
pub use ingest::{spawn_read_pump, IngestBuffer};
pub use sink::{ConsoleSink, PresentationSink};
pub use stream::{spawn_stream, RelayPipeline, STREAM_LIFETIME, TICK_INTERVAL};
pub use transcript::{RollingTranscript, MAX_TRANSCRIPT_CHARS};

use std::sync::{Mutex, MutexGuard};

/// Lock a pipeline-internal mutex, recovering from poisoning.
///
/// The tick loop must never die on a poisoned lock; the guarded data is
/// plain text state that stays usable after a panicked writer.
pub(crate) fn lock_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
