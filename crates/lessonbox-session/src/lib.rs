//! Graded execution sessions for lessonbox.
//!
//! This crate turns one "run" click into a graded, displayable result. It
//! provides:
//! - [`ExerciseSession`]: the per-snippet state machine (source buffer,
//!   transcript, run status)
//! - [`program`]: reset-prelude and guarded-harness assembly plus sentinel
//!   classification
//! - [`Transcript`]: the bounded line buffer the UI renders
//! - [`ProgressSink`]: completion events for the progress/streak store
//!
//! Sessions share one [`lessonbox_runtime::RuntimeProvider`] and never talk
//! to each other; the interpreter's namespace is reset at the start of every
//! run so attempts cannot contaminate each other.

pub mod program;
pub mod progress;
pub mod session;
pub mod transcript;

pub use progress::{MemoryProgressStore, ProgressSink};
pub use session::{ExerciseSession, SessionStatus, Snippet};
pub use transcript::{LineKind, Transcript, TranscriptLine};
