//! Raw output ingestion from the agent process.
//!
//! The read pump is the only read path from the child PTY. It appends every
//! received chunk to an [`IngestBuffer`] and stamps last-activity; a single
//! periodic consumer later drains the buffer in one atomic hand-off. No
//! transformation happens here.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

use super::lock_recover;

/// Read buffer size for the PTY pump.
const READ_BUFFER_SIZE: usize = 4096;

/// Buffer of raw text fragments awaiting filtering.
///
/// Producer: the PTY read pump. Consumer: exactly one periodic tick, which
/// drains all buffered content at once. Concurrent drains are not supported.
pub struct IngestBuffer {
    chunks: Mutex<Vec<String>>,
    last_activity: Mutex<Instant>,
}

impl IngestBuffer {
    /// Create an empty buffer with last-activity set to now.
    pub fn new() -> Self {
        Self {
            chunks: Mutex::new(Vec::new()),
            last_activity: Mutex::new(Instant::now()),
        }
    }

    /// Append one raw chunk and stamp last-activity.
    pub fn push(&self, chunk: String) {
        lock_recover(&self.chunks).push(chunk);
        *lock_recover(&self.last_activity) = Instant::now();
    }

    /// Atomically remove and return all buffered content as one string.
    pub fn drain(&self) -> String {
        let mut chunks = lock_recover(&self.chunks);
        let joined = chunks.concat();
        chunks.clear();
        joined
    }

    /// Whether the buffer currently holds any content.
    pub fn is_empty(&self) -> bool {
        lock_recover(&self.chunks).is_empty()
    }

    /// Discard all buffered content without reading it.
    pub fn clear(&self) {
        lock_recover(&self.chunks).clear();
    }

    /// Elapsed time since the last chunk arrived.
    pub fn idle(&self) -> Duration {
        lock_recover(&self.last_activity).elapsed()
    }
}

impl Default for IngestBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Take the longest valid UTF-8 prefix from `pending`, leaving any
/// incomplete trailing sequence in place for the next read.
fn drain_valid_utf8(pending: &mut Vec<u8>) -> String {
    let valid = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        // An incomplete sequence at the tail: hold it back
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        // Genuinely invalid bytes: emit everything lossily
        Err(_) => {
            let text = String::from_utf8_lossy(pending).into_owned();
            pending.clear();
            return text;
        }
    };
    let tail = pending.split_off(valid);
    let text = String::from_utf8_lossy(pending).into_owned();
    *pending = tail;
    text
}

/// Start the PTY read pump for a spawned agent process.
///
/// Reads run in a blocking thread and feed the ingest buffer until the PTY
/// closes (EOF or EIO) or an unrecoverable error occurs. The `exited` flag
/// is raised when the pump stops, which is the exit observation for the
/// session lifecycle.
pub fn spawn_read_pump(
    reader: Box<dyn Read + Send>,
    buffer: Arc<IngestBuffer>,
    exited: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = tokio::task::spawn_blocking(move || {
            let mut reader = reader;
            let mut buf = vec![0u8; READ_BUFFER_SIZE];
            let mut pending: Vec<u8> = Vec::new();

            loop {
                match reader.read(&mut buf) {
                    Ok(0) => {
                        debug!("PTY reader: EOF");
                        break;
                    }
                    Ok(n) => {
                        trace!("PTY reader: read {} bytes", n);
                        pending.extend_from_slice(&buf[..n]);
                        let text = drain_valid_utf8(&mut pending);
                        if !text.is_empty() {
                            buffer.push(text);
                        }
                    }
                    Err(e) => {
                        // EIO on Unix typically means the PTY slave was closed
                        #[cfg(unix)]
                        if e.raw_os_error() == Some(libc::EIO) {
                            debug!("PTY reader: PTY closed (EIO)");
                            break;
                        }

                        if e.kind() == std::io::ErrorKind::BrokenPipe {
                            debug!("PTY reader: broken pipe");
                            break;
                        }

                        error!("PTY reader error: {}", e);
                        break;
                    }
                }
            }
        })
        .await;

        if let Err(e) = result {
            error!("PTY reader task panicked: {}", e);
        }
        exited.store(true, Ordering::SeqCst);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_push_and_drain() {
        let buffer = IngestBuffer::new();
        buffer.push("abc".into());
        buffer.push("def".into());

        assert!(!buffer.is_empty());
        assert_eq!(buffer.drain(), "abcdef");
        assert!(buffer.is_empty());
        assert_eq!(buffer.drain(), "");
    }

    #[test]
    fn test_clear_discards_content() {
        let buffer = IngestBuffer::new();
        buffer.push("abc".into());
        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_push_resets_idle() {
        let buffer = IngestBuffer::new();
        std::thread::sleep(Duration::from_millis(30));
        assert!(buffer.idle() >= Duration::from_millis(30));
        buffer.push("x".into());
        assert!(buffer.idle() < Duration::from_millis(30));
    }

    #[test]
    fn test_drain_valid_utf8_complete() {
        let mut pending = "h\u{00e9}llo".as_bytes().to_vec();
        assert_eq!(drain_valid_utf8(&mut pending), "h\u{00e9}llo");
        assert!(pending.is_empty());
    }

    #[test]
    fn test_drain_valid_utf8_holds_incomplete_tail() {
        // é is 0xC3 0xA9; split it across reads
        let mut pending = vec![b'a', 0xC3];
        assert_eq!(drain_valid_utf8(&mut pending), "a");
        assert_eq!(pending, vec![0xC3]);

        pending.push(0xA9);
        assert_eq!(drain_valid_utf8(&mut pending), "\u{00e9}");
        assert!(pending.is_empty());
    }

    #[test]
    fn test_drain_valid_utf8_invalid_bytes_lossy() {
        let mut pending = vec![0xFF, b'a'];
        let text = drain_valid_utf8(&mut pending);
        assert!(text.contains('a'));
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_read_pump_feeds_buffer() {
        let data = b"Hello, World!\nTest line 2\n";
        let cursor = Cursor::new(data.to_vec());

        let buffer = Arc::new(IngestBuffer::new());
        let exited = Arc::new(AtomicBool::new(false));
        let pump = spawn_read_pump(Box::new(cursor), Arc::clone(&buffer), Arc::clone(&exited));

        let _ = tokio::time::timeout(Duration::from_millis(500), pump).await;

        assert_eq!(buffer.drain(), String::from_utf8_lossy(data));
        assert!(exited.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_read_pump_empty_reader() {
        let cursor = Cursor::new(Vec::new());
        let buffer = Arc::new(IngestBuffer::new());
        let exited = Arc::new(AtomicBool::new(false));

        let pump = spawn_read_pump(Box::new(cursor), Arc::clone(&buffer), Arc::clone(&exited));
        let _ = tokio::time::timeout(Duration::from_millis(500), pump).await;

        assert!(buffer.is_empty());
        assert!(exited.load(Ordering::SeqCst));
    }
}
