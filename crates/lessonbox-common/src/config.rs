//! Configuration structures for the lessonbox sandbox.
//!
//! This module defines configuration options for the two components:
//! - [`SandboxConfig`]: Top-level configuration containing all settings
//! - [`RuntimeSettings`]: Interpreter acquisition settings
//! - [`SessionSettings`]: Per-session presentation settings

use serde::{Deserialize, Serialize};

/// Top-level sandbox configuration.
///
/// This structure contains all configuration options for the sandbox.
/// It can be loaded from files (TOML, JSON) or built in code.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SandboxConfig {
    /// Interpreter runtime configuration.
    #[serde(default)]
    pub runtime: RuntimeSettings,

    /// Per-session configuration.
    #[serde(default)]
    pub session: SessionSettings,
}

/// Interpreter runtime configuration.
///
/// These settings affect the one-time acquisition of the embedded
/// interpreter shared by all sessions in the process.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RuntimeSettings {
    /// Modules imported during acquisition.
    ///
    /// Warming the module cache up front keeps first-run latency low and
    /// lets lessons rely on these modules being importable. A module that
    /// cannot be imported fails the whole acquisition.
    #[serde(default)]
    pub preload_modules: Vec<String>,
}

/// Per-session configuration.
///
/// These settings control how a single snippet session presents its results.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionSettings {
    /// Maximum number of streamed transcript lines kept per run.
    ///
    /// A runaway print loop cannot grow the transcript past this bound;
    /// one truncation marker is appended instead. Verdict lines are not
    /// subject to the cap.
    #[serde(default = "defaults::max_transcript_lines")]
    pub max_transcript_lines: usize,

    /// The congratulatory line appended when a graded run passes.
    #[serde(default = "defaults::success_banner")]
    pub success_banner: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_transcript_lines: defaults::max_transcript_lines(),
            success_banner: defaults::success_banner(),
        }
    }
}

/// Default value functions for serde.
mod defaults {
    pub const fn max_transcript_lines() -> usize {
        1000
    }

    pub fn success_banner() -> String {
        "Well done! All checks passed.".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SandboxConfig::default();

        assert!(config.runtime.preload_modules.is_empty());
        assert_eq!(config.session.max_transcript_lines, 1000);
        assert_eq!(config.session.success_banner, "Well done! All checks passed.");
    }

    #[test]
    fn test_config_serialization() {
        let config = SandboxConfig {
            runtime: RuntimeSettings {
                preload_modules: vec!["math".into(), "random".into()],
            },
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: SandboxConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(
            config.runtime.preload_modules,
            deserialized.runtime.preload_modules
        );
        assert_eq!(
            config.session.max_transcript_lines,
            deserialized.session.max_transcript_lines
        );
    }

    #[test]
    fn test_partial_deserialization() {
        let json = r#"{"session": {"max_transcript_lines": 50}}"#;
        let config: SandboxConfig = serde_json::from_str(json).unwrap();

        // Explicitly set value
        assert_eq!(config.session.max_transcript_lines, 50);
        // Default values for unspecified fields
        assert_eq!(config.session.success_banner, "Well done! All checks passed.");
        assert!(config.runtime.preload_modules.is_empty());
    }
}
