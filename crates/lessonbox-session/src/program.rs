//! Program assembly and the grading verdict protocol.
//!
//! A run never executes the learner's source as-is. The session assembles:
//!
//! 1. A namespace-reset prelude that removes every binding left behind by a
//!    previous run, so attempts cannot contaminate each other through the
//!    interpreter's shared `__main__` namespace.
//! 2. The learner's source, unmodified.
//! 3. When the snippet is graded, a guarded harness block that converts any
//!    harness exception into a failure verdict and never lets harness errors
//!    masquerade as learner errors.
//!
//! The harness reports its verdict in-band: one line that is exactly
//! [`PASS_SENTINEL`] on success, or one line starting with
//! [`FAIL_SENTINEL`]`:` plus a human-readable detail on failure. The markers
//! are long reserved strings no ordinary program prints; the session consumes
//! them during classification and they never reach the rendered transcript.

/// Line emitted by a harness whose checks all passed.
pub const PASS_SENTINEL: &str = "__LESSONBOX_HARNESS_PASS_c9d41e7a55f0__";

/// Prefix of the line emitted by a harness that failed; the failure detail
/// follows a `:` separator.
pub const FAIL_SENTINEL: &str = "__LESSONBOX_HARNESS_FAIL_c9d41e7a55f0__";

/// Interpreter-internal names the reset prelude must leave untouched.
///
/// Any `__main__` binding not on this list is considered leftover session
/// state and is removed before the next run.
const PRESERVED_GLOBALS: &[&str] = &[
    "__name__",
    "__doc__",
    "__package__",
    "__loader__",
    "__spec__",
    "__annotations__",
    "__builtins__",
];

/// Classification of one grading run, produced from sentinel lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessVerdict {
    /// Whether every check passed.
    pub passed: bool,
    /// Human-readable failure detail, when available.
    pub failure_detail: Option<String>,
}

impl HarnessVerdict {
    fn pass() -> Self {
        Self {
            passed: true,
            failure_detail: None,
        }
    }

    fn fail(failure_detail: Option<String>) -> Self {
        Self {
            passed: false,
            failure_detail,
        }
    }
}

/// What one output line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    /// A consumed sentinel carrying the harness verdict.
    Verdict(HarnessVerdict),
    /// An ordinary line for the transcript.
    Text,
}

/// Inspect one output line for the reserved verdict markers.
pub fn classify_line(line: &str) -> LineClass {
    if line == PASS_SENTINEL {
        return LineClass::Verdict(HarnessVerdict::pass());
    }
    if let Some(rest) = line.strip_prefix(FAIL_SENTINEL) {
        let detail = rest.strip_prefix(':').unwrap_or(rest).trim();
        let detail = if detail.is_empty() {
            None
        } else {
            Some(detail.to_string())
        };
        return LineClass::Verdict(HarnessVerdict::fail(detail));
    }
    LineClass::Text
}

/// Assemble the full program text for one run.
pub fn compose_program(source: &str, harness: Option<&str>) -> String {
    let mut program = reset_prelude();
    program.push('\n');
    program.push_str(source);
    if !program.ends_with('\n') {
        program.push('\n');
    }
    if let Some(harness) = harness {
        program.push_str(&guarded_harness(harness));
    }
    program
}

/// Code run before the learner's source to clear leftover bindings.
///
/// Best-effort isolation: the namespace is genuinely shared, so a run that
/// mutates interpreter internals can still leak state. Ordinary variables,
/// functions, and imports do not survive.
fn reset_prelude() -> String {
    let preserved = PRESERVED_GLOBALS
        .iter()
        .map(|name| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "for _stale in [_name for _name in globals() if _name not in ({preserved})]:\n\
         \x20   globals().pop(_stale, None)\n\
         globals().pop('_stale', None)\n"
    )
}

/// Wrap the harness so its own errors become failure verdicts.
///
/// A missing name signals that the learner deleted or never defined a
/// variable the checks depend on, and gets an actionable message instead of
/// a stack trace. A failed assertion reports its message. Anything else is
/// reported as `type: message`. Exactly one sentinel line is printed on
/// every path.
fn guarded_harness(harness: &str) -> String {
    let mut body = String::new();
    for line in harness.lines() {
        body.push_str("    ");
        body.push_str(line);
        body.push('\n');
    }
    body.push_str("    pass\n");

    format!(
        "try:\n\
         {body}\
         except NameError as _check_err:\n\
         \x20   print('{fail}:' + 'a required variable is missing (' + str(_check_err) + ')')\n\
         except AssertionError as _check_err:\n\
         \x20   print('{fail}:' + (str(_check_err) or 'assertion failed'))\n\
         except Exception as _check_err:\n\
         \x20   print('{fail}:' + type(_check_err).__name__ + ': ' + str(_check_err))\n\
         else:\n\
         \x20   print('{ok}')\n",
        fail = FAIL_SENTINEL,
        ok = PASS_SENTINEL,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_preserves_interpreter_names() {
        let prelude = reset_prelude();

        for name in PRESERVED_GLOBALS {
            assert!(prelude.contains(name), "prelude must preserve {name}");
        }
        assert!(prelude.contains("globals().pop(_stale, None)"));
        assert!(prelude.contains("globals().pop('_stale', None)"));
    }

    #[test]
    fn test_compose_without_harness() {
        let program = compose_program("x = 1", None);

        assert!(program.contains("x = 1\n"));
        assert!(!program.contains("try:"));
        assert!(!program.contains(PASS_SENTINEL));
    }

    #[test]
    fn test_compose_adds_missing_newline_before_harness() {
        let program = compose_program("x = 2 + 2", Some("assert x == 4"));

        assert!(program.contains("x = 2 + 2\ntry:"));
        assert!(program.contains("    assert x == 4\n"));
    }

    #[test]
    fn test_harness_lines_are_indented() {
        let wrapped = guarded_harness("total = x + y\nassert total == 3");

        assert!(wrapped.starts_with("try:\n"));
        assert!(wrapped.contains("    total = x + y\n"));
        assert!(wrapped.contains("    assert total == 3\n"));
        assert!(wrapped.contains("except NameError"));
        assert!(wrapped.contains("except AssertionError"));
    }

    #[test]
    fn test_classify_pass_sentinel() {
        assert_eq!(
            classify_line(PASS_SENTINEL),
            LineClass::Verdict(HarnessVerdict::pass())
        );
    }

    #[test]
    fn test_classify_fail_sentinel_with_detail() {
        let line = format!("{FAIL_SENTINEL}:expected x to equal 4");
        let LineClass::Verdict(verdict) = classify_line(&line) else {
            panic!("expected a verdict");
        };

        assert!(!verdict.passed);
        assert_eq!(verdict.failure_detail.as_deref(), Some("expected x to equal 4"));
    }

    #[test]
    fn test_classify_fail_sentinel_without_detail() {
        let line = format!("{FAIL_SENTINEL}:");
        let LineClass::Verdict(verdict) = classify_line(&line) else {
            panic!("expected a verdict");
        };

        assert!(!verdict.passed);
        assert!(verdict.failure_detail.is_none());
    }

    #[test]
    fn test_ordinary_lines_are_text() {
        assert_eq!(classify_line("hello"), LineClass::Text);
        assert_eq!(classify_line(""), LineClass::Text);
        // A line merely containing the marker mid-line is not a verdict.
        let embedded = format!("prefix {PASS_SENTINEL}");
        assert_eq!(classify_line(&embedded), LineClass::Text);
    }
}
