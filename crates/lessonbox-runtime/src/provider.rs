//! Interpreter lifecycle and the execution entry point.
//!
//! The [`RuntimeProvider`] owns the single embedded CPython interpreter
//! shared by every session in the process. It is responsible for:
//!
//! 1. Acquiring the interpreter exactly once (idempotent, single-flight)
//! 2. Reporting readiness so callers can gate their run controls
//! 3. Executing source text with per-run output callbacks
//!
//! # Shared namespace
//!
//! All runs execute against the interpreter's `__main__` globals. Bindings
//! left behind by one run are visible to the next; isolation between runs is
//! the session layer's job (it prepends a namespace-reset prelude).
//!
//! # Reentrancy
//!
//! The output sinks are persistent objects re-pointed on each call, so two
//! overlapping `run` calls would fight over them. The provider therefore
//! serializes runs through a FIFO gate: a second caller waits instead of
//! hijacking the first caller's output stream.

use std::ffi::CString;

use parking_lot::RwLock;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use lessonbox_common::{RuntimeSettings, SandboxError};

use crate::sink::{LineSink, OutputSink, StreamKind};

/// Readiness of the shared interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Acquisition has not been requested yet.
    Uninitialized,
    /// Acquisition is in flight.
    Loading,
    /// The interpreter is ready to execute source text.
    Ready,
    /// Acquisition failed; the execution feature is unavailable.
    Failed,
}

impl std::fmt::Display for Readiness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Readiness::Uninitialized => write!(f, "uninitialized"),
            Readiness::Loading => write!(f, "loading"),
            Readiness::Ready => write!(f, "ready"),
            Readiness::Failed => write!(f, "failed"),
        }
    }
}

/// Handles captured at acquisition: the shared `__main__` namespace and the
/// two persistent stream sinks.
struct PyRuntime {
    globals: Py<PyDict>,
    stdout: Py<LineSink>,
    stderr: Py<LineSink>,
}

enum LifecycleState {
    Uninitialized,
    Loading,
    Ready(PyRuntime),
    Failed(String),
}

impl LifecycleState {
    fn readiness(&self) -> Readiness {
        match self {
            LifecycleState::Uninitialized => Readiness::Uninitialized,
            LifecycleState::Loading => Readiness::Loading,
            LifecycleState::Ready(_) => Readiness::Ready,
            LifecycleState::Failed(_) => Readiness::Failed,
        }
    }
}

/// Owner of the process-wide embedded interpreter.
///
/// One provider is mounted near the root of the page tree and shared by
/// reference across all sessions. Sessions never mutate it; they read its
/// readiness and invoke [`run`](Self::run).
///
/// Constructing a second provider in the same process re-points the
/// interpreter's streams at the newer provider's sinks; keep one per process.
pub struct RuntimeProvider {
    settings: RuntimeSettings,
    state: RwLock<LifecycleState>,
    init_gate: Mutex<()>,
    run_gate: Mutex<()>,
}

impl RuntimeProvider {
    /// Create a provider. No interpreter work happens until
    /// [`initialize`](Self::initialize) is called.
    pub fn new(settings: RuntimeSettings) -> Self {
        Self {
            settings,
            state: RwLock::new(LifecycleState::Uninitialized),
            init_gate: Mutex::new(()),
            run_gate: Mutex::new(()),
        }
    }

    /// Current readiness snapshot.
    pub fn readiness(&self) -> Readiness {
        self.state.read().readiness()
    }

    /// Acquire the embedded interpreter.
    ///
    /// Idempotent: the first caller performs the acquisition, concurrent
    /// callers await the same in-flight attempt, and later callers observe
    /// the settled outcome. A failed acquisition is sticky; every subsequent
    /// call reports the same failure.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::AcquisitionFailed`] if the interpreter or one
    /// of the configured preload modules cannot be acquired.
    pub async fn initialize(&self) -> Result<(), SandboxError> {
        if let Some(settled) = self.settled_outcome() {
            return settled;
        }

        let _gate = self.init_gate.lock().await;
        if let Some(settled) = self.settled_outcome() {
            return settled;
        }

        *self.state.write() = LifecycleState::Loading;
        info!("acquiring embedded interpreter");

        match acquire_runtime(&self.settings) {
            Ok(runtime) => {
                *self.state.write() = LifecycleState::Ready(runtime);
                info!("embedded interpreter ready");
                Ok(())
            }
            Err(err) => {
                let reason = err.to_string();
                error!(error = %reason, "interpreter acquisition failed");
                *self.state.write() = LifecycleState::Failed(reason.clone());
                Err(SandboxError::acquisition_failed(reason))
            }
        }
    }

    fn settled_outcome(&self) -> Option<Result<(), SandboxError>> {
        match &*self.state.read() {
            LifecycleState::Ready(_) => Some(Ok(())),
            LifecycleState::Failed(reason) => {
                Some(Err(SandboxError::acquisition_failed(reason.clone())))
            }
            _ => None,
        }
    }

    /// Execute `source` in the shared namespace.
    ///
    /// Every line the interpreter prints to standard output is delivered to
    /// `on_output`, every standard-error line to `on_error`. An exception
    /// raised by `source` is caught, formatted as exactly one error line on
    /// the `on_error` path, and the call still returns `Ok` so callers have
    /// a single failure channel to inspect. Runs are serialized; a second
    /// caller waits its turn.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::NotReady`] when the interpreter has not been
    /// acquired (callers are expected to gate on [`readiness`](Self::readiness)),
    /// and [`SandboxError::InvalidSource`] when the source text cannot be
    /// handed to the interpreter at all.
    #[instrument(skip_all, fields(source_len = source.len()))]
    pub async fn run(
        &self,
        source: &str,
        on_output: OutputSink,
        on_error: OutputSink,
    ) -> Result<(), SandboxError> {
        let readiness = self.readiness();
        if readiness != Readiness::Ready {
            return Err(SandboxError::not_ready(readiness.to_string()));
        }

        let code = CString::new(source)
            .map_err(|_| SandboxError::invalid_source("source text contains a NUL byte"))?;

        let _turn = self.run_gate.lock().await;
        let run_id = Uuid::new_v4();

        let state = self.state.read();
        let LifecycleState::Ready(runtime) = &*state else {
            return Err(SandboxError::not_ready(state.readiness().to_string()));
        };

        debug!(run_id = %run_id, "executing source in shared namespace");

        Python::with_gil(|py| {
            runtime.stdout.borrow_mut(py).redirect(on_output);
            runtime.stderr.borrow_mut(py).redirect(on_error);

            // User code may have rebound sys.stdout during a previous run;
            // re-point the interpreter at the persistent sinks every time.
            if let Err(err) = install_streams(py, &runtime.stdout, &runtime.stderr) {
                warn!(run_id = %run_id, error = %err, "could not reinstall interpreter streams");
            }

            let outcome = py.run(code.as_c_str(), Some(runtime.globals.bind(py)), None);
            match outcome {
                Ok(()) => debug!(run_id = %run_id, "source completed"),
                Err(err) => {
                    let line = err.to_string();
                    warn!(run_id = %run_id, error = %line, "source raised");
                    runtime.stderr.borrow_mut(py).emit_line(line.trim_end());
                }
            }

            runtime.stdout.borrow_mut(py).release();
            runtime.stderr.borrow_mut(py).release();
        });

        Ok(())
    }
}

impl std::fmt::Debug for RuntimeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeProvider")
            .field("readiness", &self.readiness())
            .field("preload_modules", &self.settings.preload_modules)
            .finish_non_exhaustive()
    }
}

/// Boot the interpreter and capture the handles every run needs.
///
/// Preload imports run before the sinks are installed, so a failed
/// acquisition never leaves the interpreter's streams re-pointed.
fn acquire_runtime(settings: &RuntimeSettings) -> PyResult<PyRuntime> {
    pyo3::prepare_freethreaded_python();

    Python::with_gil(|py| {
        let globals = py.import("__main__")?.dict().unbind();

        for module in &settings.preload_modules {
            py.import(module.as_str())?;
            debug!(module = %module, "module preloaded");
        }

        let stdout = Py::new(py, LineSink::new(StreamKind::Stdout))?;
        let stderr = Py::new(py, LineSink::new(StreamKind::Stderr))?;
        install_streams(py, &stdout, &stderr)?;

        Ok(PyRuntime {
            globals,
            stdout,
            stderr,
        })
    })
}

fn install_streams(
    py: Python<'_>,
    stdout: &Py<LineSink>,
    stderr: &Py<LineSink>,
) -> PyResult<()> {
    let sys = py.import("sys")?;
    sys.setattr("stdout", stdout.clone_ref(py))?;
    sys.setattr("stderr", stderr.clone_ref(py))?;
    Ok(())
}
