//! Integration tests for lessonbox-runtime.
//!
//! These tests exercise the real embedded interpreter:
//! - Acquisition and readiness lifecycle
//! - Output stream capture into line callbacks
//! - Exception conversion to a single error line
//!
//! All tests that execute code share one provider; the interpreter is
//! process-wide state and the shared provider's run gate serializes access.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use lessonbox_common::RuntimeSettings;
use lessonbox_runtime::{OutputSink, Readiness, RuntimeProvider};

static PROVIDER: OnceLock<Arc<RuntimeProvider>> = OnceLock::new();

async fn ready_provider() -> Arc<RuntimeProvider> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let provider = PROVIDER
        .get_or_init(|| Arc::new(RuntimeProvider::new(RuntimeSettings::default())))
        .clone();
    provider
        .initialize()
        .await
        .expect("interpreter should initialize");
    provider
}

fn collector() -> (Arc<Mutex<Vec<String>>>, OutputSink) {
    let store = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&store);
    let sink: OutputSink = Box::new(move |line: &str| captured.lock().push(line.to_string()));
    (store, sink)
}

// ============================================================================
// Test: Initialization Lifecycle
// ============================================================================

#[tokio::test]
async fn test_initialize_is_idempotent() {
    let provider = ready_provider().await;

    provider.initialize().await.unwrap();
    provider.initialize().await.unwrap();

    assert_eq!(provider.readiness(), Readiness::Ready);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_initialize_shares_one_attempt() {
    // A provider that fails acquisition never touches the interpreter's
    // streams, so it is safe to race alongside the shared provider.
    let provider = Arc::new(RuntimeProvider::new(RuntimeSettings {
        preload_modules: vec!["definitely_not_a_real_module_77aa".into()],
    }));

    let first = tokio::spawn({
        let provider = Arc::clone(&provider);
        async move { provider.initialize().await }
    });
    let second = tokio::spawn({
        let provider = Arc::clone(&provider);
        async move { provider.initialize().await }
    });

    // Both callers observe the same settled failure, whichever of them
    // performed the acquisition.
    assert!(first.await.unwrap().unwrap_err().is_acquisition_failure());
    assert!(second.await.unwrap().unwrap_err().is_acquisition_failure());
    assert_eq!(provider.readiness(), Readiness::Failed);
}

#[tokio::test]
async fn test_preload_failure_is_sticky() {
    let provider = RuntimeProvider::new(RuntimeSettings {
        preload_modules: vec!["definitely_not_a_real_module_0b2c".into()],
    });

    let first = provider.initialize().await;
    assert!(first.unwrap_err().is_acquisition_failure());
    assert_eq!(provider.readiness(), Readiness::Failed);

    // Later attempts report the same settled failure.
    let second = provider.initialize().await;
    assert!(second.unwrap_err().is_acquisition_failure());

    // And execution is refused.
    let run = provider
        .run("print('never')", Box::new(|_| {}), Box::new(|_| {}))
        .await;
    assert!(run.unwrap_err().is_not_ready());
}

// ============================================================================
// Test: Output Capture
// ============================================================================

#[tokio::test]
async fn test_print_lines_reach_output_sink() {
    let provider = ready_provider().await;
    let (out, out_sink) = collector();
    let (err, err_sink) = collector();

    provider
        .run("print('hello')\nprint('world')", out_sink, err_sink)
        .await
        .unwrap();

    assert_eq!(*out.lock(), vec!["hello", "world"]);
    assert!(err.lock().is_empty());
}

#[tokio::test]
async fn test_partial_line_is_flushed_at_run_end() {
    let provider = ready_provider().await;
    let (out, out_sink) = collector();
    let (_, err_sink) = collector();

    provider
        .run(
            "import sys\nsys.stdout.write('no newline')",
            out_sink,
            err_sink,
        )
        .await
        .unwrap();

    assert_eq!(*out.lock(), vec!["no newline"]);
}

#[tokio::test]
async fn test_stderr_writes_reach_error_sink() {
    let provider = ready_provider().await;
    let (out, out_sink) = collector();
    let (err, err_sink) = collector();

    provider
        .run(
            "import sys\nsys.stderr.write('careful now\\n')",
            out_sink,
            err_sink,
        )
        .await
        .unwrap();

    assert!(out.lock().is_empty());
    assert_eq!(*err.lock(), vec!["careful now"]);
}

// ============================================================================
// Test: Exception Conversion
// ============================================================================

#[tokio::test]
async fn test_exception_becomes_single_error_line() {
    let provider = ready_provider().await;
    let (out, out_sink) = collector();
    let (err, err_sink) = collector();

    let result = provider.run("1 / 0", out_sink, err_sink).await;

    // The promise resolves; failure is visible only on the error path.
    assert!(result.is_ok());
    assert!(out.lock().is_empty());

    let errors = err.lock();
    assert_eq!(errors.len(), 1, "expected one error line, got {errors:?}");
    assert!(errors[0].contains("ZeroDivisionError"));
}

#[tokio::test]
async fn test_output_before_exception_is_preserved() {
    let provider = ready_provider().await;
    let (out, out_sink) = collector();
    let (err, err_sink) = collector();

    provider
        .run("print('before')\nundefined_name", out_sink, err_sink)
        .await
        .unwrap();

    assert_eq!(*out.lock(), vec!["before"]);
    let errors = err.lock();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("NameError"));
}

// ============================================================================
// Test: Source Validation
// ============================================================================

#[tokio::test]
async fn test_nul_byte_source_is_rejected() {
    let provider = ready_provider().await;

    let result = provider
        .run("print('a')\0", Box::new(|_| {}), Box::new(|_| {}))
        .await;

    assert!(matches!(
        result.unwrap_err(),
        lessonbox_common::SandboxError::InvalidSource { .. }
    ));
}
