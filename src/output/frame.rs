//! Heuristic frame filter for bordered agent TUI output.
//!
//! The agent CLI has no structured output protocol: everything arrives as a
//! continuously-repainted text UI with a bordered input box, footer hints,
//! braille spinners, and progress bars. This filter reduces one captured
//! frame to the settled content above the active input box, expressed as an
//! ordered pipeline of line transforms and line drops.
//!
//! The filter is total: it never fails, and lines that match none of the
//! known chrome patterns pass through unchanged.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ansi::AnsiStripper;

/// Number of trailing lines treated as the transient region
/// (active input box plus footer) and dropped from every frame.
const TRANSIENT_TAIL_LINES: usize = 4;

/// Lines consisting of border/divider glyphs and whitespace only.
static BORDER_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t\u{2500}-\u{257F}]+$").expect("border pattern"));

/// Footer shortcut/enhancer/command hints.
static FOOTER_HINTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(Ctrl\+P|Prompt Enhancer|\? to show shortcuts|type / for commands)")
        .expect("footer pattern")
});

/// "Try '...'" suggestion lines.
static TRY_HINT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bTry '.*'").expect("try pattern"));

/// Right-aligned filesystem path with nothing after it.
static RIGHT_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z]:\\[^\s]+$").expect("path pattern"));

/// Pane-framed line: content between matching left/right border glyphs.
static PANE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[\u{2502}\u{2551}](.*?)[\u{2502}\u{2551}]\s*$").expect("pane pattern")
});

/// Whole line is a braille spinner plus a status word.
static SPINNER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*[\u{2800}-\u{28FF}].*\b(Sending|Processing|Indexing)\b.*$")
        .expect("spinner pattern")
});

/// Progress bar segments with a percentage.
static PROGRESS_BAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{2591}\u{2588}]+\s*\d+%").expect("progress pattern"));

/// Lone prompt symbol with no text.
static BARE_PROMPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[>\u{203A}\u{276F}\u{00BB}]\s*$").expect("prompt pattern"));

/// Runs of 20+ whitespace characters and nothing else.
static WIDE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s{20,}$").expect("spaces pattern"));

/// Spinner glyph followed by a status phrase, appended to content.
static SPINNER_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[\u{2800}-\u{28FF}]\s*(Sending request|Processing response|Indexing)[^\r\n]*$")
        .expect("spinner suffix pattern")
});

/// Ellipsis status phrase appended to content.
static STATUS_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*(Sending request|Processing response|Indexing)\.{3}[^\r\n]*$")
        .expect("status suffix pattern")
});

/// "(... esc to interrupt)" annotations.
static ESC_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*\([^)]*esc to interrupt\)[^\r\n]*$").expect("esc pattern"));

/// Trailing decorative divider runs, with optional corner glyphs.
static DIVIDER_TAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[ \t\u{2500}-\u{257F}]*[\u{256D}\u{2570}]?[\u{2500}\u{2501}\u{2550}\u{2504}\u{2505}\u{2506}\u{2507}\u{254C}\u{254D}]+[\u{256E}\u{256F}]?[ \t]*$",
    )
    .expect("divider pattern")
});

/// The indexing-completion marker the agent prints once startup indexing
/// finishes. It usually lands inside the transient tail, so it is captured
/// before the tail is dropped and re-appended when filtered out.
static COMPLETION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Indexing complete").expect("marker pattern"));

/// Heuristic frame filter: raw captured frame in, settled content out.
pub struct FrameFilter;

impl FrameFilter {
    /// Reduce one raw frame to its settled, chrome-free content.
    pub fn clean(raw: &str) -> String {
        let stripped = AnsiStripper::strip_str(raw);
        let lines: Vec<&str> = stripped
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();

        // Remember a completion marker anywhere in the frame; the transient
        // tail cut below may otherwise swallow it.
        let marker: Option<String> = lines.iter().rev().find_map(|line| {
            let trimmed = line.trim();
            COMPLETION_MARKER
                .is_match(trimmed)
                .then(|| trimmed.to_string())
        });

        // Drop the transient region: active input box plus footer.
        let base: &[&str] = if lines.len() > TRANSIENT_TAIL_LINES {
            &lines[..lines.len() - TRANSIENT_TAIL_LINES]
        } else {
            &lines[..]
        };

        // Find the LAST input-box triple: top border, pane line, bottom
        // border. Everything from there down is the box being typed into.
        let mut last_top: Option<usize> = None;
        for i in 0..base.len().saturating_sub(2) {
            if base[i].trim_start().starts_with('\u{256d}')
                && base[i + 1].trim_start().starts_with('\u{2502}')
                && base[i + 2].trim_start().starts_with('\u{2570}')
            {
                last_top = Some(i);
            }
        }
        let slice = match last_top {
            Some(top) => &base[..top],
            None => base,
        };

        let mut out: Vec<String> = Vec::new();
        for raw_line in slice {
            let mut candidate = raw_line.trim_end().to_string();

            // Extract inner content from pane-framed lines
            if let Some(caps) = PANE_LINE.captures(&candidate) {
                candidate = caps
                    .get(1)
                    .map(|m| m.as_str().trim_end())
                    .unwrap_or_default()
                    .to_string();
            }

            // Drop inline spinner/status suffixes even when appended to content
            candidate = SPINNER_SUFFIX.replace(&candidate, "").into_owned();
            candidate = STATUS_SUFFIX.replace(&candidate, "").into_owned();
            candidate = ESC_HINT.replace(&candidate, "").into_owned();
            candidate = DIVIDER_TAIL.replace(&candidate, "").into_owned();
            let candidate = candidate.trim_end();

            if candidate.trim().is_empty() {
                continue;
            }
            if BORDER_ONLY.is_match(candidate) {
                continue;
            }
            if FOOTER_HINTS.is_match(candidate) {
                continue;
            }
            if TRY_HINT.is_match(candidate) {
                continue;
            }
            if RIGHT_PATH.is_match(candidate) {
                continue;
            }
            if SPINNER_LINE.is_match(candidate) {
                continue;
            }
            if PROGRESS_BAR.is_match(candidate) {
                continue;
            }
            if BARE_PROMPT.is_match(candidate) {
                continue;
            }
            if WIDE_SPACES.is_match(candidate) {
                continue;
            }

            out.push(candidate.to_string());
        }

        // Collapse immediately-consecutive duplicate lines
        out.dedup();

        if let Some(marker) = marker {
            if !out.iter().any(|line| COMPLETION_MARKER.is_match(line)) {
                out.push(marker);
            }
        }

        out.join("\n").trim().to_string()
    }
}
