//! Prereq discovery and direct-change detection.
//!
//! The first half of planning a build: walk the page tree for source
//! files, then compare each against its target's modification time. Files
//! that are stale only through their imports are the planner's business
//! ([`plan_build`](crate::plan::plan_build)); this module only looks at
//! the files themselves.

use std::io;
use std::path::{Path, PathBuf};

use kiln_deps::{DepsError, MtimeSource};

/// Recursively collects every file under `dir` with extension `ext`
/// (written without the dot), sorted by path.
pub fn find_prereqs(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, DepsError> {
    let mut files = Vec::new();
    walk_dir(dir, ext, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk_dir(dir: &Path, ext: &str, files: &mut Vec<PathBuf>) -> Result<(), DepsError> {
    let entries = std::fs::read_dir(dir).map_err(|source| walk_error(dir, source))?;
    for entry in entries {
        let entry = entry.map_err(|source| walk_error(dir, source))?;
        let path = entry.path();
        if path.is_dir() {
            walk_dir(&path, ext, files)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some(ext) {
            files.push(path);
        }
    }
    Ok(())
}

fn walk_error(dir: &Path, source: io::Error) -> DepsError {
    if source.kind() == io::ErrorKind::NotFound {
        DepsError::NotFound {
            path: dir.to_path_buf(),
        }
    } else {
        DepsError::Io {
            path: dir.to_path_buf(),
            source,
        }
    }
}

/// Returns the prereqs whose target is missing or older than the prereq
/// itself, preserving input order.
///
/// Prereqs that map to no target are skipped. A target exactly as old as
/// its prereq counts as up to date.
pub fn directly_changed<M, F>(
    mtimes: &M,
    prereqs: &[PathBuf],
    target_for: F,
) -> Result<Vec<PathBuf>, DepsError>
where
    M: MtimeSource,
    F: Fn(&Path) -> Option<PathBuf>,
{
    let mut changed = Vec::new();
    for prereq in prereqs {
        let Some(target) = target_for(prereq) else {
            continue;
        };
        match mtimes.mtime(&target) {
            Err(DepsError::NotFound { .. }) => changed.push(prereq.clone()),
            Err(e) => return Err(e),
            Ok(target_time) => {
                if target_time < mtimes.mtime(prereq)? {
                    changed.push(prereq.clone());
                }
            }
        }
    }
    Ok(changed)
}
