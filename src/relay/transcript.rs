//! Bounded rolling transcript and display window.

use crate::output::TRANSPORT_LIMIT;

/// Maximum characters retained in the rolling transcript.
///
/// When exceeded, only the most recent content is kept; the oldest text is
/// dropped silently.
pub const MAX_TRANSCRIPT_CHARS: usize = 12_000;

/// The bounded, most-recent-content-biased accumulation of filtered output
/// for one turn, plus the last-emitted display snapshot.
#[derive(Debug)]
pub struct RollingTranscript {
    rolling: String,
    snapshot: Option<String>,
    cap: usize,
    window: usize,
}

impl RollingTranscript {
    /// Create an empty transcript with the standard cap and window size.
    pub fn new() -> Self {
        Self::with_limits(MAX_TRANSCRIPT_CHARS, TRANSPORT_LIMIT)
    }

    /// Create an empty transcript with explicit limits.
    pub fn with_limits(cap: usize, window: usize) -> Self {
        Self {
            rolling: String::new(),
            snapshot: None,
            cap,
            window,
        }
    }

    /// Append one cleaned chunk, newline-joined, enforcing the cap.
    pub fn append(&mut self, chunk: &str) {
        if !self.rolling.is_empty() {
            self.rolling.push('\n');
        }
        self.rolling.push_str(chunk);

        if self.rolling.chars().count() > self.cap {
            self.rolling = tail_chars(&self.rolling, self.cap).to_string();
        }
    }

    /// Compute the display window (trailing slice sized to one transport
    /// message) and compare it to the last-emitted snapshot.
    ///
    /// Returns `Some(window)` and updates the snapshot only when the window
    /// differs from the previous emission; `None` means nothing new to push.
    pub fn changed_window(&mut self) -> Option<String> {
        let window = tail_chars(&self.rolling, self.window);
        if self.snapshot.as_deref() == Some(window) {
            return None;
        }
        let window = window.to_string();
        self.snapshot = Some(window.clone());
        Some(window)
    }

    /// The full transcript accumulated so far.
    pub fn full(&self) -> &str {
        &self.rolling
    }

    /// Transcript length in characters.
    pub fn char_len(&self) -> usize {
        self.rolling.chars().count()
    }

    /// Whether any content has accumulated.
    pub fn is_empty(&self) -> bool {
        self.rolling.is_empty()
    }

    /// Clear the transcript and forget the snapshot (new turn).
    pub fn reset(&mut self) {
        self.rolling.clear();
        self.snapshot = None;
    }
}

impl Default for RollingTranscript {
    fn default() -> Self {
        Self::new()
    }
}

/// Trailing `n` characters of `s`, on char boundaries.
fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((index, _)) => &s[index..],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_joins_with_newline() {
        let mut transcript = RollingTranscript::new();
        transcript.append("abc");
        transcript.append("def");
        assert_eq!(transcript.full(), "abc\ndef");
    }

    #[test]
    fn test_cap_keeps_trailing_content() {
        let mut transcript = RollingTranscript::with_limits(10, 5);
        transcript.append("0123456789");
        transcript.append("abcde");
        // "0123456789\nabcde" is 16 chars; only the last 10 survive
        assert_eq!(transcript.char_len(), 10);
        assert_eq!(transcript.full(), "6789\nabcde");
    }

    #[test]
    fn test_cap_equals_tail_of_accumulation() {
        let cap = 12_000;
        let mut transcript = RollingTranscript::with_limits(cap, 1900);
        let mut accumulated = String::new();
        for _ in 0..13 {
            let chunk = "x".repeat(1000);
            if !accumulated.is_empty() {
                accumulated.push('\n');
            }
            accumulated.push_str(&chunk);
            transcript.append(&chunk);
        }
        assert_eq!(transcript.char_len(), cap);
        let expected: String = accumulated
            .chars()
            .skip(accumulated.chars().count() - cap)
            .collect();
        assert_eq!(transcript.full(), expected);
    }

    #[test]
    fn test_window_is_trailing_slice() {
        let mut transcript = RollingTranscript::with_limits(100, 4);
        transcript.append("abcdefgh");
        assert_eq!(transcript.changed_window().as_deref(), Some("efgh"));
    }

    #[test]
    fn test_unchanged_window_not_reemitted() {
        let mut transcript = RollingTranscript::new();
        transcript.append("hello");
        assert!(transcript.changed_window().is_some());
        assert!(transcript.changed_window().is_none());
    }

    #[test]
    fn test_window_changes_after_new_content() {
        let mut transcript = RollingTranscript::new();
        transcript.append("one");
        assert_eq!(transcript.changed_window().as_deref(), Some("one"));
        transcript.append("two");
        assert_eq!(transcript.changed_window().as_deref(), Some("one\ntwo"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut transcript = RollingTranscript::new();
        transcript.append("content");
        let _ = transcript.changed_window();
        transcript.reset();
        assert!(transcript.is_empty());
        // Snapshot forgotten: the same content counts as changed again
        transcript.append("content");
        assert!(transcript.changed_window().is_some());
    }

    #[test]
    fn test_tail_chars_multibyte() {
        let s = "a\u{00e9}\u{00e9}b";
        assert_eq!(tail_chars(s, 2), "\u{00e9}b");
        assert_eq!(tail_chars(s, 10), s);
        assert_eq!(tail_chars(s, 0), "");
    }
}
