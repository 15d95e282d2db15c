//! Mapping of page sources to their build targets.

use std::path::{Path, PathBuf};

/// Maps prereq paths under one root to target paths under another,
/// swapping the file extension: `src/pages/a/b.dj` becomes
/// `build/a/b.html` for `Reroot::new("src/pages", "build", "dj", "html")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reroot {
    from_root: PathBuf,
    to_root: PathBuf,
    from_ext: String,
    to_ext: String,
}

impl Reroot {
    /// Creates a mapping from `from_root/**/*.from_ext` to
    /// `to_root/**/*.to_ext`. Extensions are written without the dot.
    pub fn new(
        from_root: impl Into<PathBuf>,
        to_root: impl Into<PathBuf>,
        from_ext: impl Into<String>,
        to_ext: impl Into<String>,
    ) -> Self {
        Self {
            from_root: from_root.into(),
            to_root: to_root.into(),
            from_ext: from_ext.into(),
            to_ext: to_ext.into(),
        }
    }

    /// The target path for `prereq`, or `None` when the prereq is outside
    /// the source root or does not carry the source extension.
    pub fn target(&self, prereq: &Path) -> Option<PathBuf> {
        let rel = prereq.strip_prefix(&self.from_root).ok()?;
        if rel.extension().and_then(|e| e.to_str()) != Some(self.from_ext.as_str()) {
            return None;
        }
        Some(self.to_root.join(rel.with_extension(&self.to_ext)))
    }
}
