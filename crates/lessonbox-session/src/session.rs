//! Per-snippet execution sessions.
//!
//! An [`ExerciseSession`] owns one editor's worth of state: the source
//! buffer, the transcript, and the run status. Each run click turns into one
//! assembled program (reset prelude + source + optional guarded harness),
//! one execution on the shared runtime provider, and one classification of
//! the result. Nothing is thrown out of [`execute_once`](ExerciseSession::execute_once);
//! every failure kind ends up as status plus transcript content, so the UI
//! layer never needs a catch path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use lessonbox_common::{SessionSettings, SnippetEntry};
use lessonbox_runtime::{OutputSink, Readiness, RuntimeProvider};

use crate::program::{self, HarnessVerdict, LineClass};
use crate::progress::ProgressSink;
use crate::transcript::{LineKind, Transcript, TranscriptLine};

/// One runnable snippet, as handed over by the content pipeline.
#[derive(Debug, Clone, Default)]
pub struct Snippet {
    /// Initial source code, ready to run.
    pub source: String,
    /// Grading code, when the snippet is a graded exercise.
    pub harness: Option<String>,
    /// Opaque lesson identifier for progress events.
    pub lesson_id: Option<String>,
}

impl Snippet {
    /// A free-form snippet with no grading.
    pub fn ungraded(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    /// A graded exercise.
    pub fn graded(source: impl Into<String>, harness: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            harness: Some(harness.into()),
            ..Default::default()
        }
    }

    /// Attach the lesson this snippet belongs to.
    pub fn for_lesson(mut self, lesson_id: impl Into<String>) -> Self {
        self.lesson_id = Some(lesson_id.into());
        self
    }

    /// Build a snippet from a lesson manifest entry.
    pub fn from_entry(lesson_id: &str, entry: &SnippetEntry) -> Self {
        Self {
            source: entry.source.clone(),
            harness: entry.harness.clone(),
            lesson_id: Some(lesson_id.to_string()),
        }
    }
}

/// Run status of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No run has happened since creation or the last reset.
    Idle,
    /// A run is in flight.
    Running,
    /// The last run completed and, when graded, every check passed.
    Succeeded,
    /// The last run faulted or a check failed.
    Failed,
    /// A graded run completed without producing a verdict.
    ///
    /// The harness neither passed nor failed (for example the learner's code
    /// re-pointed the output stream or swallowed the harness). Neither a
    /// success banner nor a failure detail is shown, and the learner can run
    /// again.
    NoVerdict,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Running => write!(f, "running"),
            SessionStatus::Succeeded => write!(f, "succeeded"),
            SessionStatus::Failed => write!(f, "failed"),
            SessionStatus::NoVerdict => write!(f, "no verdict"),
        }
    }
}

/// What the run handlers observed, separate from the transcript.
#[derive(Debug, Clone, Default)]
struct RunScratch {
    verdict: Option<HarnessVerdict>,
    faulted: bool,
}

/// One learner-facing run context.
///
/// Sessions share the [`RuntimeProvider`] by reference and own everything
/// else. A session is cheap to create when its widget mounts and holds no
/// state worth persisting past unmount.
pub struct ExerciseSession {
    provider: Arc<RuntimeProvider>,
    settings: SessionSettings,
    lesson_id: Option<String>,
    harness: Option<String>,
    original_source: String,
    source: Mutex<String>,
    transcript: Arc<Mutex<Transcript>>,
    status: Mutex<SessionStatus>,
    in_flight: AtomicBool,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl ExerciseSession {
    /// Create a session for one snippet.
    pub fn new(
        provider: Arc<RuntimeProvider>,
        snippet: Snippet,
        settings: SessionSettings,
    ) -> Self {
        let transcript = Transcript::new(settings.max_transcript_lines);
        // An all-whitespace harness has nothing to check and would not even
        // compile once wrapped; treat it as absent.
        let harness = snippet.harness.filter(|h| !h.trim().is_empty());

        Self {
            provider,
            settings,
            lesson_id: snippet.lesson_id,
            harness,
            original_source: snippet.source.clone(),
            source: Mutex::new(snippet.source),
            transcript: Arc::new(Mutex::new(transcript)),
            status: Mutex::new(SessionStatus::Idle),
            in_flight: AtomicBool::new(false),
            progress: None,
        }
    }

    /// Attach a progress sink receiving completion events for graded runs.
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Current source buffer.
    pub fn source(&self) -> String {
        self.source.lock().clone()
    }

    /// The snippet's original source, as supplied at creation.
    pub fn original_source(&self) -> &str {
        &self.original_source
    }

    /// Replace the source buffer (the learner edited the code).
    pub fn set_source(&self, source: impl Into<String>) {
        *self.source.lock() = source.into();
    }

    /// Current run status.
    pub fn status(&self) -> SessionStatus {
        *self.status.lock()
    }

    /// Returns `true` while a run is in flight.
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Owned copy of the transcript, for rendering.
    pub fn transcript(&self) -> Vec<TranscriptLine> {
        self.transcript.lock().snapshot()
    }

    /// Execute the current source once and classify the result.
    ///
    /// A second call while a run is in flight is a no-op, and a call while
    /// the provider is not ready refuses to run; in both cases transcript and
    /// status are left untouched. Every other outcome is reported through
    /// status and transcript, never as an error.
    ///
    /// Returns the session status as of the end of this call.
    #[instrument(skip(self), fields(lesson_id = self.lesson_id.as_deref().unwrap_or("")))]
    pub async fn execute_once(&self) -> SessionStatus {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            warn!("run already in flight; ignoring");
            return self.status();
        }

        let readiness = self.provider.readiness();
        if readiness != Readiness::Ready {
            warn!(state = %readiness, "interpreter not ready; refusing to run");
            self.in_flight.store(false, Ordering::SeqCst);
            return self.status();
        }

        let run_id = Uuid::new_v4();
        debug!(run_id = %run_id, "starting run");

        self.transcript.lock().clear();
        *self.status.lock() = SessionStatus::Running;

        let program = {
            let source = self.source.lock();
            program::compose_program(&source, self.harness.as_deref())
        };

        let scratch = Arc::new(Mutex::new(RunScratch::default()));
        let (on_output, on_error) = self.run_handlers(&scratch);

        let run_result = self.provider.run(&program, on_output, on_error).await;

        let observed = scratch.lock().clone();
        let status = match run_result {
            Ok(()) => self.classify(run_id, &observed),
            Err(err) => {
                warn!(run_id = %run_id, error = %err, "run rejected by the provider");
                self.transcript
                    .lock()
                    .record(LineKind::Error, &format!("this code could not be run: {err}"));
                SessionStatus::Failed
            }
        };

        *self.status.lock() = status;
        self.in_flight.store(false, Ordering::SeqCst);
        info!(run_id = %run_id, status = %status, "run finished");
        status
    }

    /// Restore the original source, clear the transcript, return to idle.
    ///
    /// Ignored while a run is in flight (the UI disables reset mid-run).
    /// Idempotent, and never talks to the provider.
    pub fn reset(&self) {
        if self.in_flight.load(Ordering::SeqCst) {
            debug!("reset ignored while a run is in flight");
            return;
        }

        *self.source.lock() = self.original_source.clone();
        self.transcript.lock().clear();
        *self.status.lock() = SessionStatus::Idle;
    }

    /// Build the two per-run line handlers.
    ///
    /// The output handler consumes sentinel lines into the verdict; everything
    /// else lands in the transcript verbatim. The error handler marks the run
    /// as faulted, which outranks any harness verdict during classification.
    fn run_handlers(&self, scratch: &Arc<Mutex<RunScratch>>) -> (OutputSink, OutputSink) {
        let out_scratch = Arc::clone(scratch);
        let out_transcript = Arc::clone(&self.transcript);
        let on_output: OutputSink = Box::new(move |line: &str| {
            match program::classify_line(line) {
                LineClass::Verdict(verdict) => {
                    debug!(passed = verdict.passed, "harness verdict observed");
                    out_scratch.lock().verdict = Some(verdict);
                }
                LineClass::Text => out_transcript.lock().append(LineKind::Output, line),
            }
        });

        let err_scratch = Arc::clone(scratch);
        let err_transcript = Arc::clone(&self.transcript);
        let on_error: OutputSink = Box::new(move |line: &str| {
            err_scratch.lock().faulted = true;
            err_transcript.lock().append(LineKind::Error, line);
        });

        (on_output, on_error)
    }

    /// Turn the run observations into a final status and verdict lines.
    fn classify(&self, run_id: Uuid, observed: &RunScratch) -> SessionStatus {
        if observed.faulted {
            return SessionStatus::Failed;
        }

        if self.harness.is_none() {
            return SessionStatus::Succeeded;
        }

        match &observed.verdict {
            Some(verdict) if verdict.passed => {
                self.transcript
                    .lock()
                    .record(LineKind::Success, &self.settings.success_banner);
                self.notify_progress();
                SessionStatus::Succeeded
            }
            Some(verdict) => {
                let detail = verdict
                    .failure_detail
                    .clone()
                    .unwrap_or_else(|| "a check did not pass".to_string());
                self.transcript.lock().record(LineKind::Failure, &detail);
                SessionStatus::Failed
            }
            None => {
                warn!(run_id = %run_id, "graded run produced no verdict");
                SessionStatus::NoVerdict
            }
        }
    }

    fn notify_progress(&self) {
        if let (Some(sink), Some(lesson_id)) = (self.progress.as_ref(), self.lesson_id.as_deref())
        {
            sink.lesson_completed(lesson_id);
        }
    }
}

impl std::fmt::Debug for ExerciseSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExerciseSession")
            .field("lesson_id", &self.lesson_id)
            .field("graded", &self.harness.is_some())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use lessonbox_common::RuntimeSettings;

    use super::*;

    fn idle_session(snippet: Snippet) -> ExerciseSession {
        let provider = Arc::new(RuntimeProvider::new(RuntimeSettings::default()));
        ExerciseSession::new(provider, snippet, SessionSettings::default())
    }

    #[test]
    fn test_snippet_constructors() {
        let plain = Snippet::ungraded("print('hi')");
        assert!(plain.harness.is_none());
        assert!(plain.lesson_id.is_none());

        let graded = Snippet::graded("x = 2 + 2", "assert x == 4").for_lesson("intro");
        assert_eq!(graded.harness.as_deref(), Some("assert x == 4"));
        assert_eq!(graded.lesson_id.as_deref(), Some("intro"));
    }

    #[test]
    fn test_blank_harness_is_treated_as_absent() {
        let session = idle_session(Snippet::graded("x = 1", "   \n  "));
        assert!(session.harness.is_none());
    }

    #[test]
    fn test_reset_is_idempotent() {
        let session = idle_session(Snippet::ungraded("x = 1"));

        session.set_source("x = 2");
        session.reset();
        assert_eq!(session.source(), "x = 1");
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.transcript().is_empty());

        session.reset();
        assert_eq!(session.source(), "x = 1");
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_execute_refuses_when_provider_uninitialized() {
        let session = idle_session(Snippet::ungraded("print('hi')"));

        let status = session.execute_once().await;

        assert_eq!(status, SessionStatus::Idle);
        assert!(session.transcript().is_empty());
        assert!(!session.is_running());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SessionStatus::Idle.to_string(), "idle");
        assert_eq!(SessionStatus::Running.to_string(), "running");
        assert_eq!(SessionStatus::Succeeded.to_string(), "succeeded");
        assert_eq!(SessionStatus::Failed.to_string(), "failed");
        assert_eq!(SessionStatus::NoVerdict.to_string(), "no verdict");
    }
}
