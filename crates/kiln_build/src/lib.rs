//! Build orchestration: prereq discovery, change detection, and planning.
//!
//! This crate turns the question "what must be rebuilt?" into a concrete
//! [`BuildPlan`]. It walks the page tree for prereqs, maps each to its
//! target with [`Reroot`], detects files directly newer than their
//! targets, and consults the staleness resolver for files whose imports
//! changed out from under an otherwise-untouched page. Actually producing
//! output from the plan is the caller's business.

#![warn(missing_docs)]

pub mod plan;
pub mod reroot;
pub mod scan;

pub use plan::{plan_build, BuildPlan};
pub use reroot::Reroot;
pub use scan::{directly_changed, find_prereqs};
