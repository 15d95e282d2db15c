//! Dependency-discovery cache and transitive staleness resolution.
//!
//! This crate is the bookkeeping core of the kiln build engine. It persists
//! which dependencies each tracked file had the last time it was examined
//! ([`DiscoveryStore`]), re-runs an injected discovery strategy only for
//! files that have changed since ([`DepCache`]), and resolves the newest
//! modification time reachable through the dependency graph
//! ([`latest_dep_modification`]). All freshness decisions compare file
//! modification times; nothing here ever consults the wall clock.

#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod resolve;
pub mod schema;
pub mod stamp;
pub mod store;

pub use cache::{DepCache, Discover};
pub use error::DepsError;
pub use resolve::{latest_dep_modification, StalenessMemo};
pub use schema::ShapeProblem;
pub use stamp::{mtime, MtimeSource, SystemMtime, Timestamp};
pub use store::{DepEntry, DiscoveryStore};
