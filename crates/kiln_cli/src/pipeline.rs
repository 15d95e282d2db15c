//! Shared pipeline helpers for CLI commands.
//!
//! Contains the pieces `build` and `status` have in common: project root
//! resolution, wiring the import-map resolver into a page discoverer,
//! the prereq-to-target mapping, and the plan computation itself.

use std::path::{Path, PathBuf};

use kiln_build::{directly_changed, find_prereqs, plan_build, BuildPlan, Reroot};
use kiln_config::ProjectConfig;
use kiln_deps::{DepCache, DepsError, StalenessMemo, SystemMtime};
use kiln_extract::{ImportDiscovery, ImportMap, SpecifierResolver};

use crate::GlobalArgs;

/// Walks up from `start` looking for the nearest directory containing `kiln.toml`.
///
/// Returns the directory containing `kiln.toml`, or an error if none is found.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join("kiln.toml").exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find kiln.toml in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the project root directory from global CLI args.
///
/// If `--config` is specified, uses that path (file → parent dir, dir → itself).
/// Otherwise walks up from the current directory looking for `kiln.toml`.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            Ok(p.parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")))
        } else {
            Ok(p)
        }
    } else {
        find_project_root(&std::env::current_dir()?)
    }
}

/// Builds the page discoverer configured by `[imports]`.
///
/// Specifiers resolve against the current working directory, which the
/// commands pin to the project root first, so every discovered path stays
/// root-relative and the persisted store moves with the project.
pub fn page_discovery(config: &ProjectConfig) -> ImportDiscovery {
    let map: ImportMap = config
        .imports
        .iter()
        .map(|(from, to)| (from.clone(), to.clone()))
        .collect();
    ImportDiscovery::new(SpecifierResolver::new(Path::new("."), map))
}

/// The prereq-to-target mapping configured by `[site]`.
pub fn page_reroot(config: &ProjectConfig) -> Reroot {
    Reroot::new(
        &config.site.pages,
        &config.site.output,
        config.site.page_ext.as_str(),
        config.site.output_ext.as_str(),
    )
}

/// Opens the discovery cache at the configured store path.
pub fn load_cache(config: &ProjectConfig) -> Result<DepCache<ImportDiscovery>, DepsError> {
    DepCache::load(Path::new(&config.site.cache), page_discovery(config))
}

/// Scans the page tree and computes the build plan.
///
/// With `force` every prereq counts as directly changed; otherwise the
/// direct set comes from comparing each prereq against its target and the
/// rest of the plan from the transitive staleness walk.
pub fn compute_plan(
    config: &ProjectConfig,
    cache: &mut DepCache<ImportDiscovery>,
    force: bool,
) -> Result<BuildPlan, Box<dyn std::error::Error>> {
    let prereqs = find_prereqs(Path::new(&config.site.pages), &config.site.page_ext)?;
    let reroot = page_reroot(config);

    let direct = if force {
        prereqs.clone()
    } else {
        directly_changed(&SystemMtime, &prereqs, |p| reroot.target(p))?
    };

    let mut memo = StalenessMemo::new();
    let plan = plan_build(cache, &mut memo, direct, &prereqs, |p| reroot.target(p))?;
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // -- find_project_root tests --

    #[test]
    fn find_project_root_in_current_dir() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("kiln.toml"), "[site]\n").unwrap();
        let root = find_project_root(tmp.path()).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn find_project_root_in_parent() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("kiln.toml"), "[site]\n").unwrap();
        let sub = tmp.path().join("src/pages");
        fs::create_dir_all(&sub).unwrap();
        let root = find_project_root(&sub).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn find_project_root_not_found() {
        let tmp = TempDir::new().unwrap();
        let result = find_project_root(tmp.path());
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("could not find kiln.toml"));
    }

    // -- resolve_project_root tests --

    #[test]
    fn resolve_project_root_from_config_file() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("kiln.toml");
        fs::write(&config_path, "[site]\n").unwrap();

        let global = GlobalArgs {
            quiet: false,
            verbose: false,
            config: Some(config_path.to_str().unwrap().to_string()),
        };
        let root = resolve_project_root(&global).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn resolve_project_root_from_config_dir() {
        let tmp = TempDir::new().unwrap();
        let global = GlobalArgs {
            quiet: false,
            verbose: false,
            config: Some(tmp.path().to_str().unwrap().to_string()),
        };
        let root = resolve_project_root(&global).unwrap();
        assert_eq!(root, tmp.path());
    }

    // -- config wiring tests --

    #[test]
    fn page_reroot_uses_configured_roots() {
        let config = kiln_config::load_config_from_str("[site]\n").unwrap();
        let reroot = page_reroot(&config);
        assert_eq!(
            reroot.target(Path::new("src/pages/notes/a.dj")),
            Some(PathBuf::from("build/notes/a.html"))
        );
        assert_eq!(reroot.target(Path::new("src/other/a.dj")), None);
    }

    // -- compute_plan tests --

    fn project_config(tmp: &TempDir) -> ProjectConfig {
        let toml = format!(
            "[site]\npages = \"{}\"\noutput = \"{}\"\ncache = \"{}\"\n",
            tmp.path().join("pages").display(),
            tmp.path().join("out").display(),
            tmp.path().join("deps.json").display(),
        );
        kiln_config::load_config_from_str(&toml).unwrap()
    }

    fn write(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn compute_plan_missing_targets_are_direct() {
        let tmp = TempDir::new().unwrap();
        let config = project_config(&tmp);
        write(&tmp.path().join("pages/a.dj"), "alpha");
        write(&tmp.path().join("pages/b.dj"), "beta");

        let mut cache = load_cache(&config).unwrap();
        let plan = compute_plan(&config, &mut cache, false).unwrap();

        assert_eq!(
            plan.direct,
            vec![tmp.path().join("pages/a.dj"), tmp.path().join("pages/b.dj")]
        );
        assert!(plan.dependency_stale.is_empty());
    }

    #[test]
    fn compute_plan_fresh_targets_mean_empty_plan() {
        let tmp = TempDir::new().unwrap();
        let config = project_config(&tmp);
        write(&tmp.path().join("pages/a.dj"), "alpha");
        write(&tmp.path().join("out/a.html"), "rendered");

        let mut cache = load_cache(&config).unwrap();
        let plan = compute_plan(&config, &mut cache, false).unwrap();

        assert!(plan.is_empty());
    }

    #[test]
    fn compute_plan_force_rebuilds_fresh_targets() {
        let tmp = TempDir::new().unwrap();
        let config = project_config(&tmp);
        write(&tmp.path().join("pages/a.dj"), "alpha");
        write(&tmp.path().join("out/a.html"), "rendered");

        let mut cache = load_cache(&config).unwrap();
        let plan = compute_plan(&config, &mut cache, true).unwrap();

        assert_eq!(plan.direct, vec![tmp.path().join("pages/a.dj")]);
    }

    #[test]
    fn compute_plan_missing_page_dir_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let config = project_config(&tmp);

        let mut cache = load_cache(&config).unwrap();
        let result = compute_plan(&config, &mut cache, false);
        assert!(result.is_err());
    }
}
