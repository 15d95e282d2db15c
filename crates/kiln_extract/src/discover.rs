//! File-level dependency discovery for the build cache.
//!
//! [`ImportDiscovery`] is the [`Discover`] implementation the rest of the
//! build plugs into a [`kiln_deps::DepCache`]: given a file path it reads
//! the file once and returns every local file the source references.
//! Module files are scanned whole for imports; everything else is treated
//! as a page and searched for filter scripts, whose `src` references and
//! inline bodies contribute the dependencies. A file with no references
//! still participates in the staleness walk through its modification time.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use kiln_deps::{DepsError, Discover};

use crate::resolve::SpecifierResolver;
use crate::scan::{scan_module, scan_module_at};
use crate::script::find_filter_scripts;
use crate::warn::WarningSink;

/// Extensions treated as scannable module source.
const MODULE_EXTENSIONS: [&str; 6] = ["js", "jsx", "mjs", "mts", "ts", "tsx"];

/// Discovers the direct local dependencies of project files.
#[derive(Debug)]
pub struct ImportDiscovery {
    resolver: SpecifierResolver,
    warnings: WarningSink,
}

impl ImportDiscovery {
    /// Creates a discovery pass that resolves references with `resolver`.
    pub fn new(resolver: SpecifierResolver) -> Self {
        Self {
            resolver,
            warnings: WarningSink::new(),
        }
    }

    /// Warnings accumulated across every file discovered so far.
    pub fn warnings(&self) -> &WarningSink {
        &self.warnings
    }

    /// Specifiers referenced by a page: each filter script's `src`, plus
    /// everything its inline body imports.
    fn page_specifiers(&self, path: &Path, source: &str) -> Vec<String> {
        let mut specifiers = Vec::new();
        for script in find_filter_scripts(source) {
            if let Some(src) = script.src {
                specifiers.push(src);
            }
            if !script.body.is_empty() {
                specifiers.extend(scan_module_at(
                    &script.body,
                    path,
                    script.line,
                    &self.warnings,
                ));
            }
        }
        specifiers
    }
}

impl Discover for ImportDiscovery {
    fn discover(&mut self, path: &Path) -> Result<BTreeSet<PathBuf>, DepsError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let specifiers = if MODULE_EXTENSIONS.contains(&ext) {
            let source = read_source(path)?;
            scan_module(&source, path, &self.warnings)
        } else {
            // Pages (and anything else a page might reference, stylesheets
            // or data files) are searched for filter scripts. Non-UTF-8
            // content is replaced rather than rejected; a binary file simply
            // contains no scripts.
            let bytes = read_bytes(path)?;
            match String::from_utf8_lossy(&bytes) {
                Cow::Borrowed(source) => self.page_specifiers(path, source),
                Cow::Owned(source) => self.page_specifiers(path, &source),
            }
        };

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut deps = BTreeSet::new();
        for specifier in &specifiers {
            if let Some(dep) = self.resolver.resolve(specifier, dir) {
                deps.insert(dep);
            }
        }
        Ok(deps)
    }
}

fn read_source(path: &Path) -> Result<String, DepsError> {
    std::fs::read_to_string(path).map_err(|source| read_error(path, source))
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, DepsError> {
    std::fs::read(path).map_err(|source| read_error(path, source))
}

fn read_error(path: &Path, source: io::Error) -> DepsError {
    if source.kind() == io::ErrorKind::NotFound {
        DepsError::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        DepsError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
