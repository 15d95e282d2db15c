//! Static extraction of local file references from site sources.
//!
//! The build needs to know, for any file, which other project files it
//! pulls in: pages reference filter scripts, filter scripts and modules
//! import further modules. This crate finds those references by scanning
//! source text directly, without rendering pages or type-checking
//! modules, and resolves them to normalized project paths.
//!
//! [`ImportDiscovery`] packages the whole pass as a
//! [`kiln_deps::Discover`] implementation ready to back a discovery
//! cache; the lower layers ([`scan_module`], [`find_filter_scripts`],
//! [`SpecifierResolver`]) are usable on their own.

#![warn(missing_docs)]

pub mod discover;
pub mod resolve;
pub mod scan;
pub mod script;
pub mod warn;

pub use discover::ImportDiscovery;
pub use resolve::{normalize_path, ImportMap, SpecifierResolver};
pub use scan::{scan_module, scan_module_at};
pub use script::{find_filter_scripts, FilterScript};
pub use warn::{Warning, WarningSink};
