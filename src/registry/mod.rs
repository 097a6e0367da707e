//! Package registry collaborator.
//!
//! The scanner only talks to the registry through [`PackageRegistry`], so
//! tests can drive it with an in-memory fake.

mod npm;

pub use npm::NpmRegistry;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{DownloadPeriod, DownloadStats, PackageMetadata};

#[async_trait]
pub trait PackageRegistry: Send + Sync {
    fn name(&self) -> &'static str;

    /// Registry document for `name`. An unknown package is [`NotFound`].
    ///
    /// [`NotFound`]: crate::error::ScanError::NotFound
    async fn metadata(&self, name: &str) -> Result<PackageMetadata>;

    async fn download_stats(&self, name: &str, period: DownloadPeriod) -> Result<DownloadStats>;

    /// Raw bytes of a package archive.
    async fn tarball(&self, url: &str) -> Result<Vec<u8>>;
}

/// Escapes a package name for use as a single URL path segment.
///
/// Scoped names keep their `@` but the separating slash is encoded, which is
/// what the npm registry expects: `@babel/core` becomes `@babel%2Fcore`.
pub fn escape_name(name: &str) -> String {
    name.replace('/', "%2F")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_name() {
        assert_eq!(escape_name("lodash"), "lodash");
        assert_eq!(escape_name("@babel/core"), "@babel%2Fcore");
    }
}
