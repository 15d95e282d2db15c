//! The persisted dependency-discovery store.
//!
//! The store is a single JSON file mapping each tracked file to the time its
//! dependencies were last discovered and the set of dependencies found. Keys
//! and dependency paths are stored exactly as the discoverer produced them,
//! so every caller of one store must root its paths the same way.

use std::collections::btree_map::Iter;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::DepsError;
use crate::schema::{validate_store, ShapeProblem};
use crate::stamp::Timestamp;

/// Suffix appended to the store path while writing, before the final rename.
const TMP_SUFFIX: &str = ".tmp";

/// One tracked file: when its dependencies were last discovered, and what
/// they were.
///
/// `time` is the file's own modification time as of that discovery, never
/// the wall-clock time discovery ran. Comparing it against the file's
/// current mtime is the entire freshness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepEntry {
    /// Modification time of the file when `deps` was computed.
    pub time: Timestamp,
    /// The dependencies discovered at that point.
    pub deps: BTreeSet<PathBuf>,
}

/// In-memory form of the discovery store.
///
/// Deserialization goes through [`validate_store`] rather than a derived
/// `Deserialize`, so a malformed file reports every bad field at once.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryStore {
    entries: BTreeMap<PathBuf, DepEntry>,
}

impl DiscoveryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the store from `path`.
    ///
    /// A missing file is a fresh, empty store. A present file that is not
    /// valid JSON of the expected shape is [`DepsError::CorruptStore`],
    /// carrying one problem per mismatched field; it is never silently
    /// replaced, since dropping recorded discoveries would change which
    /// files get rebuilt.
    pub fn load(path: &Path) -> Result<Self, DepsError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => {
                return Err(DepsError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| DepsError::CorruptStore {
                path: path.to_path_buf(),
                problems: vec![ShapeProblem {
                    at: "/".to_string(),
                    expected: "valid JSON".to_string(),
                    actual: e.to_string(),
                }],
            })?;

        match validate_store(&value) {
            Ok(entries) => Ok(Self { entries }),
            Err(problems) => Err(DepsError::CorruptStore {
                path: path.to_path_buf(),
                problems,
            }),
        }
    }

    /// Writes the store to `path`, creating parent directories as needed.
    ///
    /// The document is written to a sibling temp file and renamed into
    /// place, so a crash mid-save leaves the previous store intact.
    pub fn save(&self, path: &Path) -> Result<(), DepsError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| DepsError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let json =
            serde_json::to_string_pretty(&self.entries).map_err(|e| DepsError::Serialize {
                reason: e.to_string(),
            })?;

        let mut tmp = path.as_os_str().to_os_string();
        tmp.push(TMP_SUFFIX);
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json).map_err(|e| DepsError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, path).map_err(|e| DepsError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Looks up the entry for `path`.
    pub fn get(&self, path: &Path) -> Option<&DepEntry> {
        self.entries.get(path)
    }

    /// Inserts or replaces the entry for `path`.
    pub fn insert(&mut self, path: PathBuf, entry: DepEntry) {
        self.entries.insert(path, entry);
    }

    /// Removes the entry for `path`, returning it if present.
    pub fn remove(&mut self, path: &Path) -> Option<DepEntry> {
        self.entries.remove(path)
    }

    /// Number of tracked files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store tracks no files.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in path order.
    pub fn iter(&self) -> Iter<'_, PathBuf, DepEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(millis: i64, deps: &[&str]) -> DepEntry {
        DepEntry {
            time: Timestamp::from_millis(millis),
            deps: deps.iter().map(PathBuf::from).collect(),
        }
    }

    #[test]
    fn load_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiscoveryStore::load(&dir.path().join("deps.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deps.json");

        let mut store = DiscoveryStore::new();
        store.insert(
            PathBuf::from("src/pages/index.dj"),
            entry(1_709_642_530_123, &["lib/toc.ts", "lib/article.tsx"]),
        );
        store.insert(PathBuf::from("src/pages/about.dj"), entry(86_400_000, &[]));
        store.save(&path).unwrap();

        let loaded = DiscoveryStore::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        let e = loaded.get(Path::new("src/pages/index.dj")).unwrap();
        assert_eq!(e.time, Timestamp::from_millis(1_709_642_530_123));
        assert!(e.deps.contains(Path::new("lib/toc.ts")));
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".kiln").join("deps.json");
        DiscoveryStore::new().save(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deps.json");
        DiscoveryStore::new().save(&path).unwrap();
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["deps.json"]);
    }

    #[test]
    fn save_replaces_previous_contents_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deps.json");

        let mut store = DiscoveryStore::new();
        store.insert(PathBuf::from("a.dj"), entry(1_000, &["x.ts"]));
        store.save(&path).unwrap();

        store.insert(PathBuf::from("b.dj"), entry(2_000, &[]));
        store.save(&path).unwrap();

        let loaded = DiscoveryStore::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn persisted_document_is_sorted_and_iso_stamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deps.json");

        let mut store = DiscoveryStore::new();
        store.insert(PathBuf::from("b.dj"), entry(0, &[]));
        store.insert(PathBuf::from("a.dj"), entry(0, &["z.ts", "a.ts"]));
        store.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("1970-01-01T00:00:00.000Z"));
        // Map keys and dependency arrays come out in path order.
        assert!(text.find("\"a.dj\"").unwrap() < text.find("\"b.dj\"").unwrap());
        assert!(text.find("a.ts").unwrap() < text.find("z.ts").unwrap());
    }

    #[test]
    fn load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deps.json");
        std::fs::write(&path, "not valid json {{{").unwrap();

        let err = DiscoveryStore::load(&path).unwrap_err();
        match err {
            DepsError::CorruptStore { problems, .. } => {
                assert_eq!(problems.len(), 1);
                assert_eq!(problems[0].at, "/");
            }
            other => panic!("expected CorruptStore, got {other:?}"),
        }
    }

    #[test]
    fn load_reports_every_shape_problem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deps.json");
        std::fs::write(
            &path,
            r#"{
                "a.dj": {"time": 42, "deps": []},
                "b.dj": {"time": "2024-01-01T00:00:00.000Z", "deps": "lib.ts"}
            }"#,
        )
        .unwrap();

        let err = DiscoveryStore::load(&path).unwrap_err();
        match err {
            DepsError::CorruptStore { problems, .. } => {
                assert_eq!(problems.len(), 2);
            }
            other => panic!("expected CorruptStore, got {other:?}"),
        }
        let message = DiscoveryStore::load(&path).unwrap_err().to_string();
        assert!(message.contains("/a.dj/time"));
        assert!(message.contains("/b.dj/deps"));
    }

    #[test]
    fn remove_drops_the_entry() {
        let mut store = DiscoveryStore::new();
        store.insert(PathBuf::from("a.dj"), entry(0, &[]));
        assert!(store.remove(Path::new("a.dj")).is_some());
        assert!(store.is_empty());
        assert!(store.remove(Path::new("a.dj")).is_none());
    }
}
