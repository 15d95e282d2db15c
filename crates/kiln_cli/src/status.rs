//! `kiln status` — show the pending build plan without building.
//!
//! Computes the same plan `kiln build` would act on and prints it, either
//! as human-readable lines or as JSON. Read-only: the discovery store is
//! consulted and refreshed in memory but never written back.

use std::error::Error;
use std::path::Path;

use crate::pipeline::{compute_plan, load_cache, resolve_project_root};
use crate::{GlobalArgs, ReportFormat, StatusArgs};

/// Runs the `kiln status` command.
pub fn run(args: &StatusArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let project_dir = resolve_project_root(global)?;
    std::env::set_current_dir(&project_dir)?;

    let config = kiln_config::load_config(Path::new("."))?;

    let pages_dir = Path::new(&config.site.pages);
    if !pages_dir.is_dir() {
        if !global.quiet {
            eprintln!("warning: no page directory at {}", pages_dir.display());
        }
        return Ok(0);
    }

    let mut cache = load_cache(&config)?;
    let plan = compute_plan(&config, &mut cache, false)?;

    match args.format {
        ReportFormat::Text => {
            for page in &plan.direct {
                println!("changed  {}", page.display());
            }
            for page in &plan.dependency_stale {
                println!("stale    {}", page.display());
            }
            if plan.is_empty() {
                println!("up to date");
            } else {
                println!("{} page(s) to build", plan.len());
            }
        }
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&plan).unwrap_or_else(|_| "{}".to_string());
            println!("{json}");
        }
    }

    for warning in cache.discoverer().warnings().take_all() {
        eprintln!("warning: {warning}");
    }

    Ok(0)
}
