//! Terminal output processing.
//!
//! This module turns raw, continuously-redrawn terminal output into
//! chat-presentable text:
//! - ANSI escape code stripping
//! - Heuristic frame filtering (drops TUI chrome, keeps settled output)
//! - Transport-sized chunking
//!
//! # Example
//!
//! ```
//! use tui_relay::output::{AnsiStripper, FrameFilter};
//!
//! // Strip ANSI codes from raw output
//! let raw = b"\x1b[31mRed text\x1b[0m";
//! let clean = AnsiStripper::strip(raw);
//! assert_eq!(clean, "Red text");
//!
//! // Reduce a full TUI frame to its settled content
//! let frame = "\x1b[31mHello\x1b[0m\n\u{256d}\u{2500}\u{2500}\u{2500}\u{256e}\n\u{2502} > \u{2502}\n\u{2570}\u{2500}\u{2500}\u{2500}\u{256f}\nfooter hint (Ctrl+P)\n";
//! assert_eq!(FrameFilter::clean(frame), "Hello");
//! ```

mod ansi;
mod chunk;
mod frame;

pub use ansi::AnsiStripper;
pub use chunk::{split_chunks, TRANSPORT_LIMIT};
pub use frame::FrameFilter;
