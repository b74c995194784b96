//! Lesson manifest structures.
//!
//! This module defines the file format the content pipeline hands to the
//! sandbox:
//! - [`LessonFile`]: Top-level lesson manifest
//! - [`LessonMeta`]: Lesson identity shown in page chrome and progress events
//! - [`SnippetEntry`]: One runnable snippet with its optional grading code
//!
//! The content pipeline owns markup extraction and escaping; by the time a
//! manifest is produced, `source` and `harness` are ready-to-run plain text.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Top-level lesson manifest.
///
/// # Example
///
/// ```toml
/// [lesson]
/// id = "intro-variables"
/// title = "Variables"
///
/// [[snippets]]
/// source = "x = 1\nprint(x)"
///
/// [[snippets]]
/// source = "x = 2 + 2"
/// harness = "assert x == 4"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LessonFile {
    /// Lesson identity.
    pub lesson: LessonMeta,

    /// Runnable snippets, in page order.
    #[serde(default)]
    pub snippets: Vec<SnippetEntry>,
}

impl LessonFile {
    /// Load a lesson manifest from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LessonFileError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| LessonFileError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::from_toml(&content)
    }

    /// Parse a lesson manifest from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed as TOML.
    pub fn from_toml(content: &str) -> Result<Self, LessonFileError> {
        let file: Self = toml::from_str(content).map_err(|e| LessonFileError::Parse {
            message: e.to_string(),
        })?;

        debug!(
            lesson_id = %file.lesson.id,
            snippets = file.snippets.len(),
            "lesson manifest loaded"
        );

        Ok(file)
    }
}

/// Lesson identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LessonMeta {
    /// Opaque lesson identifier, used to key progress events.
    pub id: String,

    /// Human-readable lesson title.
    pub title: String,
}

/// One runnable snippet in a lesson.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SnippetEntry {
    /// Initial source code shown in the editor, ready to run.
    pub source: String,

    /// Grading code appended to the learner's source, when the snippet
    /// is a graded exercise.
    #[serde(default)]
    pub harness: Option<String>,
}

/// Lesson manifest errors.
#[derive(Debug, thiserror::Error)]
pub enum LessonFileError {
    /// Failed to read the manifest file.
    #[error("Failed to read lesson file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the manifest.
    #[error("Failed to parse lesson file: {message}")]
    Parse { message: String },
}
