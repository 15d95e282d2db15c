//! Resolution of module specifiers to project file paths.
//!
//! Mirrors how the page runtime locates modules: relative specifiers
//! resolve against the importing file, rooted specifiers against the
//! project root, and bare specifiers through the project import map.
//! Anything that does not land on a local file — bare names without a
//! mapping, remote URLs — resolves to `None` and simply does not
//! participate in the staleness graph.
//!
//! Every returned path is lexically normalized, so the same file is never
//! tracked under two spellings no matter how it was imported.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Project-wide specifier substitutions, keyed exactly or by `prefix/`.
///
/// A key ending in `/` matches every specifier that starts with it and
/// carries the remainder over to the target; the longest such key wins.
/// An exact key beats any prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportMap {
    entries: BTreeMap<String, String>,
}

impl ImportMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a mapping.
    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.entries.insert(from.into(), to.into());
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applies the map to `specifier`, returning the substituted string.
    fn apply(&self, specifier: &str) -> Option<String> {
        if let Some(target) = self.entries.get(specifier) {
            return Some(target.clone());
        }
        let mut best: Option<(&str, &str)> = None;
        for (key, target) in &self.entries {
            if key.ends_with('/') && specifier.starts_with(key.as_str()) {
                if best.map_or(true, |(b, _)| key.len() > b.len()) {
                    best = Some((key, target));
                }
            }
        }
        best.map(|(key, target)| format!("{target}{}", &specifier[key.len()..]))
    }
}

impl FromIterator<(String, String)> for ImportMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Resolves specifiers for one project.
#[derive(Debug, Clone)]
pub struct SpecifierResolver {
    root: PathBuf,
    imports: ImportMap,
}

impl SpecifierResolver {
    /// Creates a resolver for the project rooted at `root` with the given
    /// import map.
    pub fn new(root: &Path, imports: ImportMap) -> Self {
        Self {
            root: root.to_path_buf(),
            imports,
        }
    }

    /// Resolves `specifier` as written in a file whose directory is
    /// `importer_dir`. Returns `None` for references that do not designate
    /// a local file.
    pub fn resolve(&self, specifier: &str, importer_dir: &Path) -> Option<PathBuf> {
        if specifier.starts_with("./") || specifier.starts_with("../") {
            return Some(normalize_path(&importer_dir.join(specifier)));
        }
        if let Some(rooted) = specifier.strip_prefix('/') {
            return Some(normalize_path(&self.root.join(rooted)));
        }
        if let Some(local) = specifier.strip_prefix("file://") {
            // file:///path has an empty host; anything else names a remote
            // share and stays out of the graph.
            return local
                .starts_with('/')
                .then(|| normalize_path(Path::new(local)));
        }
        if let Some(mapped) = self.imports.apply(specifier) {
            return self.resolve_mapped(&mapped);
        }
        None
    }

    /// Resolves an import-map target. Targets are written relative to the
    /// project root, which is also where the map itself lives.
    fn resolve_mapped(&self, mapped: &str) -> Option<PathBuf> {
        if mapped.starts_with("./") || mapped.starts_with("../") {
            return Some(normalize_path(&self.root.join(mapped)));
        }
        if let Some(rooted) = mapped.strip_prefix('/') {
            return Some(normalize_path(&self.root.join(rooted)));
        }
        if let Some(local) = mapped.strip_prefix("file://") {
            return local
                .starts_with('/')
                .then(|| normalize_path(Path::new(local)));
        }
        if scheme_of(mapped).is_some() {
            return None;
        }
        Some(normalize_path(&self.root.join(mapped)))
    }
}

/// Collapses `.` and `..` components without touching the filesystem.
///
/// Purely lexical on purpose: resolution must not depend on what happens
/// to exist on disk, and the discovery cache keys entries by these paths.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                None | Some(Component::ParentDir) => out.push(".."),
                // `/..` is `/`.
                Some(_) => {}
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

fn scheme_of(specifier: &str) -> Option<&str> {
    let (scheme, _) = specifier.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    chars
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        .then_some(scheme)
}
