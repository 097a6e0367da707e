//! Core data types shared by the scan pipeline.
//!
//! - [`DependencyKey`] / [`DependencySet`] / [`DependencyChange`] - normalized lock-file contents
//! - [`PackageMetadata`] / [`DownloadStats`] - registry records for one package
//! - [`ExtractedFile`] - one entry of a package archive
//! - [`GlobalUsage`] - identifiers a package reads or writes without binding them
//! - [`RiskFinding`] - one leveled statement about a package version
//! - [`ScanResult`] - the terminal artifact handed to reporting
//!
//! # Example
//!
//! ```
//! use prscan::model::{DependencyKey, DependencySet};
//!
//! let old: DependencySet = [DependencyKey::new("lodash", "4.17.20")].into_iter().collect();
//! let new: DependencySet = [DependencyKey::new("lodash", "4.17.21")].into_iter().collect();
//!
//! let change = prscan::lockfile::diff(&old, &new);
//! assert_eq!(change.len(), 1);
//! ```

mod dependency;
mod finding;
mod package;
mod scan;
mod usage;

pub use dependency::*;
pub use finding::*;
pub use package::*;
pub use scan::*;
pub use usage::*;
