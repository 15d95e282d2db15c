//! The dependency-discovery cache.
//!
//! [`DepCache`] wraps the persisted [`DiscoveryStore`] and an injected
//! discovery strategy. Callers ask for a file's dependencies; the cache
//! answers from the store when the recorded discovery is at least as new as
//! the file, and runs discovery otherwise. How dependencies are found is
//! entirely the strategy's business, which keeps this type testable against
//! synthetic graphs.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::DepsError;
use crate::stamp::{MtimeSource, SystemMtime, Timestamp};
use crate::store::{DepEntry, DiscoveryStore};

/// Strategy for computing a file's direct dependencies.
///
/// Implemented for any `FnMut(&Path) -> Result<BTreeSet<PathBuf>, DepsError>`
/// closure, so simple callers and tests never need a named type. Paths in
/// the result must be rooted the same way as the paths the cache is queried
/// with; the cache stores them verbatim.
pub trait Discover {
    /// Computes the direct dependencies of `path`.
    fn discover(&mut self, path: &Path) -> Result<BTreeSet<PathBuf>, DepsError>;
}

impl<F> Discover for F
where
    F: FnMut(&Path) -> Result<BTreeSet<PathBuf>, DepsError>,
{
    fn discover(&mut self, path: &Path) -> Result<BTreeSet<PathBuf>, DepsError> {
        self(path)
    }
}

/// Mtime-keyed cache of discovered dependencies.
///
/// Each entry records the file's modification time as of its last
/// discovery. A lookup re-runs discovery only when the file's current mtime
/// is newer than the recorded one, so an unchanged file is never re-read —
/// including on the first build after a restart, which is what makes
/// persisting the store worthwhile.
pub struct DepCache<D, M = SystemMtime> {
    /// Where the store is persisted.
    store_path: PathBuf,

    /// The in-memory store, mutated as discoveries run.
    store: DiscoveryStore,

    /// Discovery strategy for cache misses.
    discover: D,

    /// Source of modification times.
    mtimes: M,
}

// Manual impl: the discovery strategy and mtime source are often closures,
// which have no `Debug`, so a derive's `D: Debug + M: Debug` bounds would
// make the cache undebuggable for exactly the callers that matter.
impl<D, M> fmt::Debug for DepCache<D, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DepCache")
            .field("store_path", &self.store_path)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl<D: Discover> DepCache<D, SystemMtime> {
    /// Loads the store at `store_path` and wraps it with `discover`,
    /// reading modification times from the filesystem.
    ///
    /// A missing store file starts empty; a corrupt one is
    /// [`DepsError::CorruptStore`].
    pub fn load(store_path: &Path, discover: D) -> Result<Self, DepsError> {
        Self::load_with(store_path, discover, SystemMtime)
    }
}

impl<D: Discover, M: MtimeSource> DepCache<D, M> {
    /// Like [`DepCache::load`], with an explicit modification-time source.
    pub fn load_with(store_path: &Path, discover: D, mtimes: M) -> Result<Self, DepsError> {
        let store = DiscoveryStore::load(store_path)?;
        Ok(Self {
            store_path: store_path.to_path_buf(),
            store,
            discover,
            mtimes,
        })
    }

    /// Returns the direct dependencies of `path`, discovering them if the
    /// recorded entry is missing or older than the file.
    ///
    /// A fresh discovery is recorded against the file's current mtime (the
    /// one fetched before discovery ran), not the wall clock, so the entry
    /// stays comparable to future mtimes of the same file.
    pub fn dependencies(&mut self, path: &Path) -> Result<BTreeSet<PathBuf>, DepsError> {
        let modified = self.mtimes.mtime(path)?;
        if let Some(entry) = self.store.get(path) {
            if modified <= entry.time {
                return Ok(entry.deps.clone());
            }
        }

        let deps = self.discover.discover(path)?;
        self.store.insert(
            path.to_path_buf(),
            DepEntry {
                time: modified,
                deps: deps.clone(),
            },
        );
        Ok(deps)
    }

    /// Reads the modification time of `path` from this cache's time source.
    pub fn mtime(&self, path: &Path) -> Result<Timestamp, DepsError> {
        self.mtimes.mtime(path)
    }

    /// Persists the store to the path it was loaded from.
    pub fn save(&self) -> Result<(), DepsError> {
        self.store.save(&self.store_path)
    }

    /// The current store contents.
    pub fn store(&self) -> &DiscoveryStore {
        &self.store
    }

    /// The path the store is persisted at.
    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// The injected discovery strategy.
    pub fn discoverer(&self) -> &D {
        &self.discover
    }
}
