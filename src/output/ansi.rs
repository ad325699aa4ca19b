//! ANSI escape sequence stripping for raw terminal frames.

use vte::{Params, Parser, Perform};

/// ANSI stripper built on the VTE parser.
///
/// Agent TUIs repaint aggressively with cursor movement, color runs, and
/// OSC title updates; everything that is not printable text or a line
/// control is discarded here.
pub struct AnsiStripper;

impl AnsiStripper {
    /// Strip ANSI escape codes from raw bytes.
    ///
    /// Returns clean UTF-8 text with all control sequences removed.
    /// Newlines, carriage returns, and tabs survive.
    pub fn strip(input: &[u8]) -> String {
        let mut collector = TextCollector::default();
        let mut parser = Parser::new();

        parser.advance(&mut collector, input);

        collector.into_string()
    }

    /// Strip ANSI codes from a string.
    pub fn strip_str(input: &str) -> String {
        Self::strip(input.as_bytes())
    }
}

/// VTE performer that keeps printable text and line controls only.
#[derive(Default)]
struct TextCollector {
    output: Vec<u8>,
}

impl TextCollector {
    fn into_string(self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Perform for TextCollector {
    fn print(&mut self, c: char) {
        let mut buf = [0u8; 4];
        let encoded = c.encode_utf8(&mut buf);
        self.output.extend_from_slice(encoded.as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            // Newline, carriage return, tab
            0x0A | 0x0D | 0x09 => self.output.push(byte),
            // Other control characters carry no content
            _ => {}
        }
    }

    fn hook(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, _action: char) {}

    fn put(&mut self, _byte: u8) {}

    fn unhook(&mut self) {}

    fn osc_dispatch(&mut self, _params: &[&[u8]], _bell_terminated: bool) {}

    fn csi_dispatch(
        &mut self,
        _params: &Params,
        _intermediates: &[u8],
        _ignore: bool,
        _action: char,
    ) {
        // Cursor movement, colors, erase - all dropped
    }

    fn esc_dispatch(&mut self, _intermediates: &[u8], _ignore: bool, _byte: u8) {}
}
