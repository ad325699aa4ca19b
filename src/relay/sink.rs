//! Presentation sink seam.

use std::io::Write;

use crate::error::RelayError;
use crate::Result;

/// Destination for relayed content.
///
/// `edit` updates the live streaming window in place; `send` delivers a
/// final chunk durably (non-editable). Both accept content up to the
/// transport limit per call. Implementations talk to the chat platform;
/// the relay core stays agnostic to the concrete transport.
#[async_trait::async_trait]
pub trait PresentationSink: Send + Sync {
    /// Replace the live streaming window with `content`.
    async fn edit(&self, content: &str) -> Result<()>;

    /// Deliver one final chunk to a durable output channel.
    async fn send(&self, content: &str) -> Result<()>;
}

/// Sink that writes to stdout, for the local console relay.
pub struct ConsoleSink;

#[async_trait::async_trait]
impl PresentationSink for ConsoleSink {
    async fn edit(&self, content: &str) -> Result<()> {
        let mut out = std::io::stdout();
        writeln!(out, "\u{2500}\u{2500} live \u{2500}\u{2500}")
            .and_then(|_| writeln!(out, "{content}"))
            .map_err(|e| RelayError::Sink(e.to_string()))
    }

    async fn send(&self, content: &str) -> Result<()> {
        let mut out = std::io::stdout();
        writeln!(out, "{content}").map_err(|e| RelayError::Sink(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_console_sink_accepts_content() {
        let sink = ConsoleSink;
        assert!(sink.edit("window").await.is_ok());
        assert!(sink.send("final").await.is_ok());
    }
}
