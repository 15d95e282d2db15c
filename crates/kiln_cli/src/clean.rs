//! `kiln clean` — delete generated outputs and the discovery store.

use std::error::Error;
use std::fs;
use std::path::Path;

use crate::pipeline::resolve_project_root;
use crate::GlobalArgs;

/// Runs the `kiln clean` command.
///
/// Removes the configured output directory and the discovery store file.
/// Both are recreated by the next `kiln build`.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let project_dir = resolve_project_root(global)?;
    std::env::set_current_dir(&project_dir)?;

    let config = kiln_config::load_config(Path::new("."))?;

    let output = Path::new(&config.site.output);
    if output.is_dir() {
        fs::remove_dir_all(output)?;
        if !global.quiet {
            eprintln!("   Removed {}", output.display());
        }
    }

    let store = Path::new(&config.site.cache);
    if store.is_file() {
        fs::remove_file(store)?;
        if !global.quiet {
            eprintln!("   Removed {}", store.display());
        }
    }

    Ok(0)
}
