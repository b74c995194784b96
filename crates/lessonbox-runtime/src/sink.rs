//! Line-oriented capture of the interpreter's output streams.
//!
//! This module provides [`LineSink`], a host-backed file-like object that is
//! installed as the interpreter's `sys.stdout` / `sys.stderr`. Everything the
//! interpreter would print is buffered here and delivered to the currently
//! installed [`OutputSink`] callback one complete line at a time.
//!
//! The two sink objects are created once, at interpreter acquisition, and
//! persist for the interpreter's lifetime; each run merely re-points them at
//! that run's callbacks. Between runs no callback is installed and written
//! text is discarded.

use pyo3::prelude::*;
use tracing::trace;

/// Per-run callback receiving one complete output line at a time.
///
/// The line is delivered without its trailing newline.
pub type OutputSink = Box<dyn FnMut(&str) + Send + Sync + 'static>;

/// Which interpreter stream a sink stands in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Stdout => write!(f, "stdout"),
            StreamKind::Stderr => write!(f, "stderr"),
        }
    }
}

/// A file-like object standing in for one interpreter output stream.
///
/// Only the methods the interpreter's `print` machinery calls are exposed to
/// Python (`write`, `flush`, and the stream predicates); re-pointing is done
/// from the host side by the runtime provider.
#[pyclass]
pub struct LineSink {
    kind: StreamKind,
    buffer: String,
    forward: Option<OutputSink>,
}

#[pymethods]
impl LineSink {
    /// File protocol: accept a chunk of text.
    fn write(&mut self, data: &str) -> usize {
        self.push_text(data);
        data.chars().count()
    }

    /// File protocol: nothing is held back beyond the current partial line.
    fn flush(&self) {}

    fn isatty(&self) -> bool {
        false
    }

    fn writable(&self) -> bool {
        true
    }

    fn readable(&self) -> bool {
        false
    }
}

impl LineSink {
    /// Create a sink for the given stream.
    pub fn new(kind: StreamKind) -> Self {
        Self {
            kind,
            buffer: String::new(),
            forward: None,
        }
    }

    /// Point the sink at a new per-run callback.
    ///
    /// Any text buffered from a previous owner is dropped.
    pub fn redirect(&mut self, sink: OutputSink) {
        self.buffer.clear();
        self.forward = Some(sink);
    }

    /// Deliver one already-complete line, flushing any buffered partial
    /// line first so ordering is preserved.
    pub fn emit_line(&mut self, line: &str) {
        self.flush_pending();
        self.deliver(line);
    }

    /// Flush the trailing partial line and detach the current callback.
    pub fn release(&mut self) {
        self.flush_pending();
        self.forward = None;
    }

    fn push_text(&mut self, data: &str) {
        self.buffer.push_str(data);
        while let Some(pos) = self.buffer.find('\n') {
            let mut line: String = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            self.deliver(&line);
        }
    }

    fn flush_pending(&mut self) {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            self.deliver(&rest);
        }
    }

    fn deliver(&mut self, line: &str) {
        match self.forward.as_mut() {
            Some(sink) => sink(line),
            None => trace!(stream = %self.kind, line, "line outside an active run discarded"),
        }
    }
}

impl std::fmt::Debug for LineSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineSink")
            .field("kind", &self.kind)
            .field("buffered_bytes", &self.buffer.len())
            .field("attached", &self.forward.is_some())
            .finish()
    }
}
