//! Transitive staleness resolution over the dependency cache.
//!
//! The resolver answers "what is the newest modification time reachable from
//! this file", walking the dependency graph depth-first through
//! [`DepCache::dependencies`]. Results are memoized in a caller-owned
//! [`StalenessMemo`] so that files shared between many roots are visited
//! once per run.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::cache::{DepCache, Discover};
use crate::error::DepsError;
use crate::stamp::{MtimeSource, Timestamp};

/// Memoized results of [`latest_dep_modification`] queries.
///
/// Valid for a single run: entries are never invalidated, so the memo must
/// be dropped once tracked files may have changed. Sharing one memo across
/// every query in a run is what keeps a build over a heavily shared
/// dependency graph linear in the number of files.
#[derive(Debug, Default)]
pub struct StalenessMemo {
    latest: HashMap<PathBuf, Timestamp>,
}

impl StalenessMemo {
    /// Creates an empty memo for a fresh run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files with a memoized answer.
    pub fn len(&self) -> usize {
        self.latest.len()
    }

    /// Whether no queries have completed yet.
    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

/// Returns the newest modification time among `path` and everything
/// transitively reachable from it.
///
/// The file itself counts: a file that is newer than all of its
/// dependencies resolves to its own mtime. A dependency that appears twice
/// on the current recursion path is [`DepsError::Cycle`]; a dependency
/// merely reachable along two separate paths is not.
pub fn latest_dep_modification<D: Discover, M: MtimeSource>(
    cache: &mut DepCache<D, M>,
    memo: &mut StalenessMemo,
    path: &Path,
) -> Result<Timestamp, DepsError> {
    let mut visiting = HashSet::new();
    visit(cache, memo, &mut visiting, path)
}

fn visit<D: Discover, M: MtimeSource>(
    cache: &mut DepCache<D, M>,
    memo: &mut StalenessMemo,
    visiting: &mut HashSet<PathBuf>,
    path: &Path,
) -> Result<Timestamp, DepsError> {
    if let Some(&known) = memo.latest.get(path) {
        return Ok(known);
    }

    let mut latest = cache.mtime(path)?;
    visiting.insert(path.to_path_buf());
    let deps = cache.dependencies(path)?;
    for dep in &deps {
        if visiting.contains(dep) {
            return Err(DepsError::Cycle {
                file: path.to_path_buf(),
                dependency: dep.clone(),
            });
        }
        latest = latest.max(visit(cache, memo, visiting, dep)?);
    }
    visiting.remove(path);
    memo.latest.insert(path.to_path_buf(), latest);
    Ok(latest)
}
