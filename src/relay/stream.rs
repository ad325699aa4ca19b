//! Rolling window engine: periodic ticks over the ingest buffer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::ingest::IngestBuffer;
use super::lock_recover;
use super::sink::PresentationSink;
use super::transcript::RollingTranscript;
use crate::output::FrameFilter;

/// Fixed tick period for an active streaming attachment.
pub const TICK_INTERVAL: Duration = Duration::from_millis(1000);

/// Hard lifetime ceiling for one streaming attachment. Past this the timer
/// stops regardless of activity.
pub const STREAM_LIFETIME: Duration = Duration::from_secs(14 * 60);

/// Per-turn relay state: rolling transcript plus the finalization flag.
pub(crate) struct TurnState {
    pub(crate) transcript: RollingTranscript,
    pub(crate) final_sent: bool,
}

/// The ingestion-to-presentation pipeline for one session.
///
/// Each tick drains the ingest buffer, filters the frame, merges it into
/// the rolling transcript, and pushes the display window to the sink when
/// it changed. Tick bodies are mutually exclusive: an overlapping fire is
/// dropped, not queued.
pub struct RelayPipeline {
    ingest: Arc<IngestBuffer>,
    turn: Mutex<TurnState>,
    ticking: AtomicBool,
}

impl RelayPipeline {
    /// Create an idle pipeline. No turn is in flight until
    /// [`begin_turn`](Self::begin_turn) is called.
    pub fn new() -> Self {
        Self {
            ingest: Arc::new(IngestBuffer::new()),
            turn: Mutex::new(TurnState {
                transcript: RollingTranscript::new(),
                final_sent: true,
            }),
            ticking: AtomicBool::new(false),
        }
    }

    /// Shared handle to the ingest buffer, for the PTY read pump.
    pub fn buffer(&self) -> Arc<IngestBuffer> {
        Arc::clone(&self.ingest)
    }

    /// Start a new turn: clear the transcript and snapshot, re-arm
    /// finalization.
    pub fn begin_turn(&self) {
        let mut turn = lock_recover(&self.turn);
        turn.transcript.reset();
        turn.final_sent = false;
    }

    /// Discard in-flight buffer and transcript state (process restart).
    pub fn discard(&self) {
        self.ingest.clear();
        lock_recover(&self.turn).transcript.reset();
    }

    /// Whether the current turn has already been finalized.
    pub fn final_sent(&self) -> bool {
        lock_recover(&self.turn).final_sent
    }

    /// Run one tick. Overlapping invocations are dropped.
    pub async fn tick(&self, sink: &dyn PresentationSink) {
        if self
            .ticking
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        self.tick_body(sink).await;
        self.ticking.store(false, Ordering::SeqCst);
    }

    async fn tick_body(&self, sink: &dyn PresentationSink) {
        if self.ingest.is_empty() {
            return;
        }
        let raw = self.ingest.drain();
        let cleaned = FrameFilter::clean(&raw);
        if cleaned.trim().is_empty() {
            return;
        }

        let window = {
            let mut turn = lock_recover(&self.turn);
            turn.transcript.append(&cleaned);
            turn.transcript.changed_window()
        };
        let Some(window) = window else {
            return;
        };

        if let Err(e) = sink.edit(&window).await {
            warn!(error = %e, "live window edit failed");
            return;
        }
        self.maybe_send_final(sink).await;
    }

    pub(crate) fn turn_state(&self) -> &Mutex<TurnState> {
        &self.turn
    }
}

impl Default for RelayPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn the streaming timer for a pipeline.
///
/// Ticks every [`TICK_INTERVAL`]; ticks missed while a body runs are
/// skipped, not queued. The task stops once [`STREAM_LIFETIME`] elapses.
/// The caller owns the handle and aborts it when a newer attachment
/// supersedes this one.
pub fn spawn_stream(
    pipeline: Arc<RelayPipeline>,
    sink: Arc<dyn PresentationSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let started = Instant::now();
        let mut ticker = interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick of a tokio interval completes immediately
        ticker.tick().await;

        while started.elapsed() < STREAM_LIFETIME {
            ticker.tick().await;
            pipeline.tick(sink.as_ref()).await;
        }
        debug!("streaming attachment reached its lifetime ceiling");
    })
}
