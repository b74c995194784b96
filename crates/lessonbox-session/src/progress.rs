//! Progress event emission.
//!
//! When a graded run passes, the session fires a completion event keyed by
//! the lesson's opaque identifier. How (or whether) the event is persisted is
//! the store's business; the session never learns the outcome.

use dashmap::DashMap;
use tracing::info;

/// Receiver of lesson-completed events.
///
/// Implementations decide how to persist completions (streaks, badges, a
/// remote service). Events are fire-and-forget.
pub trait ProgressSink: Send + Sync {
    /// A graded run for `lesson_id` just passed.
    fn lesson_completed(&self, lesson_id: &str);
}

/// In-memory progress store.
///
/// Counts completions per lesson. Suitable for tests and single-process
/// demos; a real deployment would put persistence behind [`ProgressSink`].
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    completions: DashMap<String, u64>,
}

impl MemoryProgressStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded completions for a lesson.
    pub fn completions(&self, lesson_id: &str) -> u64 {
        self.completions
            .get(lesson_id)
            .map(|entry| *entry)
            .unwrap_or(0)
    }

    /// Ids of every lesson completed at least once.
    pub fn completed_lessons(&self) -> Vec<String> {
        self.completions.iter().map(|r| r.key().clone()).collect()
    }
}

impl ProgressSink for MemoryProgressStore {
    fn lesson_completed(&self, lesson_id: &str) {
        let mut entry = self.completions.entry(lesson_id.to_string()).or_insert(0);
        *entry += 1;
        info!(lesson_id, completions = *entry, "lesson completed");
    }
}
