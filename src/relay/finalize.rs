//! Idle-based turn finalization.
//!
//! Once the agent process has been silent long enough, the trimmed rolling
//! transcript is treated as the complete answer for the turn and delivered
//! in transport-sized chunks to the durable output channel. Finalization
//! happens at most once per turn; delivery is best-effort with no retry.

use std::time::Duration;

use tracing::warn;

use super::lock_recover;
use super::sink::PresentationSink;
use super::stream::RelayPipeline;
use crate::output::{split_chunks, TRANSPORT_LIMIT};

/// Process silence required before a turn is considered complete.
pub const IDLE_THRESHOLD: Duration = Duration::from_millis(1500);

/// Maximum chunks delivered per finalized turn. Content beyond the cap is
/// dropped silently.
pub const MAX_FINAL_CHUNKS: usize = 5;

impl RelayPipeline {
    /// Finalize the turn if it is still open and the process has idled past
    /// [`IDLE_THRESHOLD`].
    ///
    /// The final-sent flag is raised unconditionally after the delivery
    /// attempt, whether or not every chunk went through.
    pub async fn maybe_send_final(&self, sink: &dyn PresentationSink) {
        let full = {
            let turn = lock_recover(self.turn_state());
            if turn.final_sent {
                return;
            }
            if self.buffer().idle() < IDLE_THRESHOLD {
                return;
            }
            turn.transcript.full().trim().to_string()
        };

        if full.is_empty() {
            lock_recover(self.turn_state()).final_sent = true;
            return;
        }

        let chunks: Vec<String> = split_chunks(&full, TRANSPORT_LIMIT)
            .into_iter()
            .take(MAX_FINAL_CHUNKS)
            .collect();

        for chunk in &chunks {
            if let Err(e) = sink.send(chunk).await {
                warn!(error = %e, "final chunk delivery failed");
                break;
            }
        }

        lock_recover(self.turn_state()).final_sent = true;
    }
}
