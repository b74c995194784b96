//! Transcript storage for one session.
//!
//! This module provides:
//! - [`TranscriptLine`] and [`LineKind`]: one displayable line and its
//!   presentation style
//! - [`Transcript`]: the bounded, append-only line buffer a session renders

/// Presentation style of a transcript line.
///
/// The UI colors lines by kind; the session never emits raw markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Ordinary interpreter output.
    Output,
    /// A runtime-level fault (exception or stderr output).
    Error,
    /// A failed check from the grading harness.
    Failure,
    /// The congratulatory banner for a passed grading harness.
    Success,
}

impl std::fmt::Display for LineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineKind::Output => write!(f, "output"),
            LineKind::Error => write!(f, "error"),
            LineKind::Failure => write!(f, "failure"),
            LineKind::Success => write!(f, "success"),
        }
    }
}

/// A single displayable transcript line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    /// Presentation style.
    pub kind: LineKind,
    /// Line content, without a trailing newline.
    pub text: String,
}

impl TranscriptLine {
    /// Create a line of the given kind.
    pub fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Marker appended once when streamed output exceeds the configured bound.
const TRUNCATION_MARKER: &str = "[output truncated]";

/// Bounded, append-only transcript buffer.
///
/// Streamed lines ([`append`](Self::append)) are subject to the configured
/// cap so a runaway print loop cannot grow the buffer without limit; verdict
/// lines ([`record`](Self::record)) always land so a run's conclusion is
/// never swallowed by its own output volume.
#[derive(Debug)]
pub struct Transcript {
    lines: Vec<TranscriptLine>,
    max_lines: usize,
    truncated: bool,
}

impl Transcript {
    /// Create an empty transcript with the given streamed-line bound.
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: Vec::new(),
            max_lines,
            truncated: false,
        }
    }

    /// Append a streamed line, subject to the cap.
    pub fn append(&mut self, kind: LineKind, text: &str) {
        if self.lines.len() >= self.max_lines {
            if !self.truncated {
                self.truncated = true;
                self.lines
                    .push(TranscriptLine::new(LineKind::Output, TRUNCATION_MARKER));
            }
            return;
        }
        self.lines.push(TranscriptLine::new(kind, text));
    }

    /// Record a verdict line, bypassing the cap.
    pub fn record(&mut self, kind: LineKind, text: &str) {
        self.lines.push(TranscriptLine::new(kind, text));
    }

    /// Drop every line and reset the truncation state.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.truncated = false;
    }

    /// The lines in append order.
    pub fn lines(&self) -> &[TranscriptLine] {
        &self.lines
    }

    /// Owned copy of the lines, for handing to a renderer.
    pub fn snapshot(&self) -> Vec<TranscriptLine> {
        self.lines.clone()
    }

    /// Number of lines currently held.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if no lines are held.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
