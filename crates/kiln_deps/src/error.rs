//! Error types for dependency tracking.

use std::path::PathBuf;

use crate::schema::ShapeProblem;

/// Errors that can occur while discovering dependencies or resolving
/// staleness.
///
/// Unlike a content-addressed artifact cache, the discovery store is not
/// fail-safe: a corrupt store or a dependency cycle is reported loudly
/// rather than treated as a miss, because silently discarding either one
/// would change which files get rebuilt.
#[derive(Debug, thiserror::Error)]
pub enum DepsError {
    /// A tracked file does not exist on disk.
    #[error("file not found: {path}")]
    NotFound {
        /// The missing file.
        path: PathBuf,
    },

    /// An I/O error occurred while reading a file or the discovery store.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file exists but the platform reported no modification time for it.
    #[error("no modification time available for {path}: {source}")]
    MtimeUnavailable {
        /// The file whose metadata lacks a modification time.
        path: PathBuf,
        /// The underlying metadata error.
        source: std::io::Error,
    },

    /// The persisted discovery store does not match the expected shape.
    ///
    /// Carries one [`ShapeProblem`] per mismatched field so a hand-edited
    /// or truncated store can be repaired in a single pass.
    #[error("invalid discovery store at {path}: {}", render_problems(.problems))]
    CorruptStore {
        /// The store file on disk.
        path: PathBuf,
        /// Every field that failed validation.
        problems: Vec<ShapeProblem>,
    },

    /// A dependency chain leads back into itself.
    #[error("file {dependency} has a recursive dependency on itself")]
    Cycle {
        /// The file whose dependency list closed the cycle.
        file: PathBuf,
        /// The dependency that was already on the current resolution path.
        dependency: PathBuf,
    },

    /// The in-memory store could not be serialized for saving.
    #[error("failed to serialize discovery store: {reason}")]
    Serialize {
        /// Description of the serialization failure.
        reason: String,
    },
}

fn render_problems(problems: &[ShapeProblem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
