use tracing::{debug, info, instrument};

use super::Scanner;
use crate::analyzer::{analyze_files, SourceFile};
use crate::archive::{self, extension_filter};
use crate::checker::RuleInput;
use crate::error::{Result, ScanError, ScanStep};
use crate::model::{DependencyKey, ScannedDependency};

impl Scanner {
    /// Runs the per-dependency pipeline for one `name@version`.
    ///
    /// Any failing step fails the dependency; the error names the step.
    #[instrument(skip(self, key), fields(dependency = %key))]
    pub async fn scan_package(&self, key: &DependencyKey) -> Result<ScannedDependency> {
        info!(registry = self.registry.name(), "scanning dependency");

        let metadata = self
            .registry
            .metadata(&key.name)
            .await
            .map_err(|e| e.during(key, ScanStep::FetchMetadata))?;

        let tarball = metadata
            .tarball(&key.version)
            .ok_or_else(|| {
                ScanError::not_found(format!("version {} of {}", key.version, key.name))
                    .during(key, ScanStep::FetchMetadata)
            })?
            .to_string();

        let downloads = self
            .registry
            .download_stats(&key.name, self.options.download_period)
            .await
            .map_err(|e| e.during(key, ScanStep::FetchStats))?;

        let bytes = self
            .registry
            .tarball(&tarball)
            .await
            .map_err(|e| e.during(key, ScanStep::FetchArchive))?;
        debug!(size = bytes.len(), "downloaded archive");

        let files: Vec<SourceFile> = archive::extract(
            &bytes,
            extension_filter(&self.options.extensions),
            &self.options.limits,
        )
        .map_err(|e| e.during(key, ScanStep::Extract))?
        .iter()
        .filter(|f| f.is_file())
        .map(SourceFile::from_extracted)
        .collect();
        drop(bytes);
        debug!(files = files.len(), "extracted source files");

        let analysis = analyze_files(&files);

        let findings = self.rules.evaluate(&RuleInput {
            name: &key.name,
            version: &key.version,
            metadata: &metadata,
            downloads: &downloads,
            globals: &analysis.usage,
            files: &files,
            now: (self.clock)(),
        });
        info!(findings = findings.len(), globals = analysis.usage.len(), "classified dependency");

        Ok(ScannedDependency {
            name: key.name.clone(),
            version: key.version.clone(),
            metadata,
            downloads,
            globals: analysis.usage,
            findings,
            skipped_files: analysis.skipped,
        })
    }
}
