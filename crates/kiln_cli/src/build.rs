//! `kiln build` — incremental page build.
//!
//! The full pipeline:
//!
//! 1. Find project root (walk up looking for `kiln.toml`) and pin the
//!    working directory to it
//! 2. Load config via `kiln_config`
//! 3. Scan the page tree and compute the build plan
//! 4. Persist the discovery store
//! 5. Render each planned page (external command or passthrough copy)
//! 6. Copy asset trees that are missing or newer
//! 7. Report accumulated extraction warnings

use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use kiln_config::{ProjectConfig, RenderConfig};
use kiln_deps::DepsError;

use crate::pipeline::{compute_plan, load_cache, page_reroot, resolve_project_root};
use crate::{BuildArgs, GlobalArgs};

/// Runs the `kiln build` command.
///
/// Returns exit code 0 on success; any pipeline failure propagates as an
/// error and aborts the run.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    // Step 1: Pin the working directory to the project root so config
    // paths and store keys stay root-relative.
    let project_dir = resolve_project_root(global)?;
    std::env::set_current_dir(&project_dir)?;

    // Step 2: Load config
    let config = kiln_config::load_config(Path::new("."))?;

    if !global.quiet {
        eprintln!("   Building {}", project_dir.display());
    }

    let pages_dir = Path::new(&config.site.pages);
    if !pages_dir.is_dir() {
        if !global.quiet {
            eprintln!("warning: no page directory at {}", pages_dir.display());
        }
        return Ok(0);
    }
    fs::create_dir_all(Path::new(&config.site.output))?;

    // Step 3: Compute the plan
    let mut cache = load_cache(&config)?;
    let plan = compute_plan(&config, &mut cache, args.force)?;

    if global.verbose {
        eprintln!(
            "   Plan: {} direct, {} dependency-stale",
            plan.direct.len(),
            plan.dependency_stale.len()
        );
    }

    // Step 4: Persist discovery results before regenerating any output,
    // so an interrupted render never loses what was already learned.
    cache.save()?;

    // Step 5: Render
    let reroot = page_reroot(&config);
    let mut rendered = 0usize;
    for page in plan.files() {
        let Some(target) = reroot.target(page) else {
            continue;
        };
        if !global.quiet {
            eprintln!("   Rendering {}", page.display());
        }
        render_page(config.render.as_ref(), page, &target)?;
        rendered += 1;
    }

    // Step 6: Assets
    let copied = copy_assets(&config)?;

    // Step 7: Warnings and summary
    let warnings = cache.discoverer().warnings().take_all();
    for warning in &warnings {
        eprintln!("warning: {warning}");
    }

    if !global.quiet {
        eprintln!(
            "   Finished: {} page(s) rendered, {} asset(s) copied, {} warning(s)",
            rendered,
            copied,
            warnings.len()
        );
    }

    Ok(0)
}

/// Renders one page into `target`, creating parent directories as needed.
///
/// With a `[render]` command configured, the page source is piped to it on
/// stdin and the target written from its stdout. Without one the page is
/// copied through unchanged.
fn render_page(
    render: Option<&RenderConfig>,
    page: &Path,
    target: &Path,
) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    let Some(render) = render else {
        fs::copy(page, target)?;
        return Ok(());
    };

    let source = fs::read(page)?;
    let mut child = Command::new(&render.command)
        .args(&render.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to spawn render command `{}`: {e}", render.command))?;

    if let Some(mut stdin) = child.stdin.take() {
        // The command may exit without draining stdin; that surfaces as a
        // broken pipe here and is reported through the exit status instead.
        if let Err(e) = stdin.write_all(&source) {
            if e.kind() != io::ErrorKind::BrokenPipe {
                return Err(e.into());
            }
        }
    }

    let output = child.wait_with_output()?;
    if !output.status.success() {
        return Err(format!(
            "render command `{}` failed on {}: {}",
            render.command,
            page.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )
        .into());
    }

    fs::write(target, &output.stdout)?;
    Ok(())
}

/// Copies each configured asset tree into the output root under the tree's
/// base name. A file goes out when its copy is missing or older than the
/// source; an equally old copy stays put. Returns the number of files copied.
fn copy_assets(config: &ProjectConfig) -> Result<usize, Box<dyn Error>> {
    let output = Path::new(&config.site.output);
    let mut copied = 0;
    for asset_root in &config.site.assets {
        let root = Path::new(asset_root);
        if !root.is_dir() {
            continue;
        }
        let Some(base) = root.file_name() else {
            continue;
        };
        copied += copy_tree(root, &output.join(base))?;
    }
    Ok(copied)
}

/// Recursively copies outdated files from `from` into `to`.
fn copy_tree(from: &Path, to: &Path) -> Result<usize, Box<dyn Error>> {
    let mut copied = 0;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let src = entry.path();
        let dest = to.join(entry.file_name());
        if src.is_dir() {
            copied += copy_tree(&src, &dest)?;
        } else if needs_copy(&src, &dest)? {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&src, &dest)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Whether `dest` is missing or strictly older than `src`.
fn needs_copy(src: &Path, dest: &Path) -> Result<bool, DepsError> {
    match kiln_deps::mtime(dest) {
        Err(DepsError::NotFound { .. }) => Ok(true),
        Err(e) => Err(e),
        Ok(dest_time) => Ok(dest_time < kiln_deps::mtime(src)?),
    }
}
