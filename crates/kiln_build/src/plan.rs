//! Build-plan computation.
//!
//! Combines the direct-change scan with the transitive staleness walk:
//! a candidate that looks untouched still needs rebuilding when a file it
//! transitively imports is newer than its generated target. The resulting
//! [`BuildPlan`] lists every file to process exactly once.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use kiln_deps::{
    latest_dep_modification, DepCache, DepsError, Discover, MtimeSource, StalenessMemo,
};
use serde::Serialize;

/// The files one build run must process, split by why they are stale.
///
/// The two lists are disjoint and each is sorted; processing order is
/// dependency-stale first, then direct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    /// Files whose own source is unchanged but whose transitive imports
    /// are newer than the generated target.
    pub dependency_stale: Vec<PathBuf>,
    /// Files directly newer than their targets, or without a target.
    pub direct: Vec<PathBuf>,
}

impl BuildPlan {
    /// Whether there is nothing to process.
    pub fn is_empty(&self) -> bool {
        self.dependency_stale.is_empty() && self.direct.is_empty()
    }

    /// Total number of files to process.
    pub fn len(&self) -> usize {
        self.dependency_stale.len() + self.direct.len()
    }

    /// Every file to process, dependency-stale ones first.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.dependency_stale
            .iter()
            .chain(self.direct.iter())
            .map(PathBuf::as_path)
    }
}

/// Computes the build plan for one run.
///
/// `direct` is the direct-change scan's result; `candidates` is the full
/// tracked set. Every candidate not already direct whose target exists
/// and predates the candidate's latest transitive dependency modification
/// joins the dependency-stale list. Candidates without an existing target
/// are skipped here: the direct scan already claims them.
pub fn plan_build<D, M, F>(
    cache: &mut DepCache<D, M>,
    memo: &mut StalenessMemo,
    direct: Vec<PathBuf>,
    candidates: &[PathBuf],
    target_for: F,
) -> Result<BuildPlan, DepsError>
where
    D: Discover,
    M: MtimeSource,
    F: Fn(&Path) -> Option<PathBuf>,
{
    let direct_set: BTreeSet<&PathBuf> = direct.iter().collect();
    let mut dependency_stale = Vec::new();
    for candidate in candidates {
        if direct_set.contains(candidate) {
            continue;
        }
        let Some(target) = target_for(candidate) else {
            continue;
        };
        let target_time = match cache.mtime(&target) {
            Ok(time) => time,
            Err(DepsError::NotFound { .. }) => continue,
            Err(e) => return Err(e),
        };
        if target_time < latest_dep_modification(cache, memo, candidate)? {
            dependency_stale.push(candidate.clone());
        }
    }
    dependency_stale.sort();
    dependency_stale.dedup();

    let mut direct = direct;
    direct.sort();
    direct.dedup();

    Ok(BuildPlan {
        dependency_stale,
        direct,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashMap;

    use super::*;
    use kiln_deps::{MtimeSource, Timestamp};

    struct FixedMtimes(HashMap<PathBuf, i64>);

    impl FixedMtimes {
        fn new(entries: &[(&str, i64)]) -> Self {
            Self(
                entries
                    .iter()
                    .map(|(p, t)| (PathBuf::from(p), *t))
                    .collect(),
            )
        }
    }

    impl MtimeSource for FixedMtimes {
        fn mtime(&self, path: &Path) -> Result<Timestamp, DepsError> {
            self.0
                .get(path)
                .copied()
                .map(Timestamp::from_millis)
                .ok_or_else(|| DepsError::NotFound {
                    path: path.to_path_buf(),
                })
        }
    }

    fn paths(items: &[&str]) -> BTreeSet<PathBuf> {
        items.iter().map(PathBuf::from).collect()
    }

    fn target(path: &Path) -> Option<PathBuf> {
        Some(Path::new("out").join(path.with_extension("html").file_name()?))
    }

    fn cache<D: Discover>(
        dir: &tempfile::TempDir,
        discover: D,
        mtimes: FixedMtimes,
    ) -> DepCache<D, FixedMtimes> {
        DepCache::load_with(&dir.path().join("deps.json"), discover, mtimes).unwrap()
    }

    #[test]
    fn newer_transitive_dep_marks_the_page_stale() {
        // a.dj itself predates its target, but the module it pulls in is
        // newer than the generated output.
        let discover = |p: &Path| {
            if p == Path::new("a.dj") {
                Ok(paths(&["lib/b.ts"]))
            } else {
                Ok(paths(&[]))
            }
        };
        let mtimes =
            FixedMtimes::new(&[("a.dj", 100), ("lib/b.ts", 500), ("out/a.html", 300)]);
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache(&dir, discover, mtimes);
        let mut memo = StalenessMemo::new();

        let plan =
            plan_build(&mut cache, &mut memo, Vec::new(), &[PathBuf::from("a.dj")], target)
                .unwrap();
        assert_eq!(plan.dependency_stale, vec![PathBuf::from("a.dj")]);
        assert!(plan.direct.is_empty());
    }

    #[test]
    fn older_deps_leave_the_page_fresh() {
        let discover = |p: &Path| {
            if p == Path::new("a.dj") {
                Ok(paths(&["lib/b.ts"]))
            } else {
                Ok(paths(&[]))
            }
        };
        let mtimes =
            FixedMtimes::new(&[("a.dj", 100), ("lib/b.ts", 200), ("out/a.html", 300)]);
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache(&dir, discover, mtimes);
        let mut memo = StalenessMemo::new();

        let plan =
            plan_build(&mut cache, &mut memo, Vec::new(), &[PathBuf::from("a.dj")], target)
                .unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn direct_files_are_not_rechecked() {
        let runs = Cell::new(0);
        let discover = |_: &Path| {
            runs.set(runs.get() + 1);
            Ok(paths(&[]))
        };
        let mtimes = FixedMtimes::new(&[("a.dj", 900), ("out/a.html", 300)]);
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache(&dir, discover, mtimes);
        let mut memo = StalenessMemo::new();

        let direct = vec![PathBuf::from("a.dj")];
        let plan =
            plan_build(&mut cache, &mut memo, direct, &[PathBuf::from("a.dj")], target).unwrap();
        assert!(plan.dependency_stale.is_empty());
        assert_eq!(plan.direct, vec![PathBuf::from("a.dj")]);
        assert_eq!(runs.get(), 0);
    }

    #[test]
    fn missing_target_is_the_direct_scans_business() {
        let runs = Cell::new(0);
        let discover = |_: &Path| {
            runs.set(runs.get() + 1);
            Ok(paths(&[]))
        };
        // No out/c.html entry at all.
        let mtimes = FixedMtimes::new(&[("c.dj", 100)]);
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache(&dir, discover, mtimes);
        let mut memo = StalenessMemo::new();

        let plan =
            plan_build(&mut cache, &mut memo, Vec::new(), &[PathBuf::from("c.dj")], target)
                .unwrap();
        assert!(plan.is_empty());
        assert_eq!(runs.get(), 0);
    }

    #[test]
    fn shared_dependency_is_resolved_once() {
        let runs = Cell::new(0);
        let discover = |p: &Path| {
            runs.set(runs.get() + 1);
            if p.extension().is_some_and(|e| e == "dj") {
                Ok(paths(&["lib/shared.ts"]))
            } else {
                Ok(paths(&[]))
            }
        };
        let mtimes = FixedMtimes::new(&[
            ("a.dj", 100),
            ("b.dj", 100),
            ("lib/shared.ts", 500),
            ("out/a.html", 300),
            ("out/b.html", 300),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache(&dir, discover, mtimes);
        let mut memo = StalenessMemo::new();

        let candidates = [PathBuf::from("a.dj"), PathBuf::from("b.dj")];
        let plan = plan_build(&mut cache, &mut memo, Vec::new(), &candidates, target).unwrap();
        assert_eq!(
            plan.dependency_stale,
            vec![PathBuf::from("a.dj"), PathBuf::from("b.dj")]
        );
        // a.dj, b.dj, and the shared module each discovered exactly once.
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn direct_list_is_sorted_and_deduped() {
        let mtimes = FixedMtimes::new(&[]);
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache(&dir, |_: &Path| Ok(paths(&[])), mtimes);
        let mut memo = StalenessMemo::new();

        let direct = vec![
            PathBuf::from("b.dj"),
            PathBuf::from("a.dj"),
            PathBuf::from("b.dj"),
        ];
        let plan = plan_build(&mut cache, &mut memo, direct, &[], target).unwrap();
        assert_eq!(plan.direct, vec![PathBuf::from("a.dj"), PathBuf::from("b.dj")]);
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn files_iterates_dependency_stale_first() {
        let plan = BuildPlan {
            dependency_stale: vec![PathBuf::from("dep.dj")],
            direct: vec![PathBuf::from("direct.dj")],
        };
        let order: Vec<_> = plan.files().collect();
        assert_eq!(order, vec![Path::new("dep.dj"), Path::new("direct.dj")]);
    }

    #[test]
    fn cycles_abort_planning() {
        let discover = |p: &Path| {
            if p == Path::new("a.dj") {
                Ok(paths(&["a.dj"]))
            } else {
                Ok(paths(&[]))
            }
        };
        let mtimes = FixedMtimes::new(&[("a.dj", 100), ("out/a.html", 300)]);
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache(&dir, discover, mtimes);
        let mut memo = StalenessMemo::new();

        let err =
            plan_build(&mut cache, &mut memo, Vec::new(), &[PathBuf::from("a.dj")], target)
                .unwrap_err();
        assert!(matches!(err, DepsError::Cycle { .. }));
    }

    #[test]
    fn serializes_for_status_output() {
        let plan = BuildPlan {
            dependency_stale: vec![PathBuf::from("a.dj")],
            direct: vec![PathBuf::from("b.dj")],
        };
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "dependency_stale": ["a.dj"],
                "direct": ["b.dj"],
            })
        );
    }
}
