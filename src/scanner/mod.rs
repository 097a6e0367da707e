//! Scan orchestration.
//!
//! A scan runs `DIFF → (per dependency: FETCH_METADATA → FETCH_STATS →
//! FETCH_ARCHIVE → EXTRACT → ANALYZE → CLASSIFY) → AGGREGATE`. Dependencies
//! are processed one at a time, in `name@version` order, and each one's steps
//! run strictly in sequence.
//!
//! # Entry points
//!
//! | Method | Input |
//! |--------|-------|
//! | [`Scanner::scan_package`] | one `name@version` |
//! | [`Scanner::scan_change`] | an already computed [`DependencyChange`] |
//! | [`Scanner::scan_lock_files`] | old/new revisions of one or more lock files |
//! | [`Scanner::scan_pull_request`] | a pull request on a [`CodeHost`](crate::github::CodeHost) |
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use prscan::checker::RuleSet;
//! use prscan::lockfile::{LockFileChange, LockFormat};
//! use prscan::registry::NpmRegistry;
//! use prscan::scanner::{ScanOptions, Scanner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let scanner = Scanner::new(Arc::new(NpmRegistry::new()), RuleSet::default(), ScanOptions::default());
//!     let lock = LockFileChange::new("yarn.lock", LockFormat::Yarn, None, std::fs::read_to_string("yarn.lock")?);
//!
//!     let result = scanner.scan_lock_files(&[lock]).await?;
//!     println!("{} findings", result.total_findings());
//!     Ok(())
//! }
//! ```

mod package;
mod pull_request;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::archive::ExtractionLimits;
use crate::checker::RuleSet;
use crate::config::{Config, IgnoreConfig};
use crate::error::{Result, ScanError, ScanStep};
use crate::lockfile::LockFileChange;
use crate::model::{DependencyChange, DependencyKey, DownloadPeriod, ScanFailure, ScanResult};
use crate::registry::PackageRegistry;

/// What a batch does when one dependency fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchMode {
    /// The first failing dependency aborts the whole scan.
    #[default]
    FailFast,
    /// Failing dependencies are recorded in [`ScanResult::failures`] and the
    /// batch continues.
    SkipFailed,
}

impl BatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchMode::FailFast => "fail-fast",
            BatchMode::SkipFailed => "skip-failed",
        }
    }
}

impl std::fmt::Display for BatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail-fast" => Ok(BatchMode::FailFast),
            "skip-failed" => Ok(BatchMode::SkipFailed),
            _ => Err(format!("Unknown batch mode: {}. Use 'fail-fast' or 'skip-failed'", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub batch_mode: BatchMode,
    pub download_period: DownloadPeriod,
    pub limits: ExtractionLimits,
    /// Archive entries with these extensions are analyzed.
    pub extensions: Vec<String>,
    pub ignore: IgnoreConfig,
}

impl ScanOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_mode: config.batch_mode,
            download_period: config.registry.download_period,
            limits: config.extraction.limits(),
            extensions: config.extraction.extensions.clone(),
            ignore: config.ignore.clone(),
        }
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub struct Scanner {
    registry: Arc<dyn PackageRegistry>,
    rules: RuleSet,
    options: ScanOptions,
    clock: fn() -> DateTime<Utc>,
}

impl Scanner {
    pub fn new(registry: Arc<dyn PackageRegistry>, rules: RuleSet, options: ScanOptions) -> Self {
        Self {
            registry,
            rules,
            options,
            clock: Utc::now,
        }
    }

    pub fn from_config(registry: Arc<dyn PackageRegistry>, config: &Config) -> Self {
        Self::new(
            registry,
            RuleSet::from_config(&config.rules),
            ScanOptions::from_config(config),
        )
    }

    /// Replaces the clock the freshness rule measures against.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Scans every dependency of `change`.
    ///
    /// # Errors
    ///
    /// In [`BatchMode::FailFast`] the first failing dependency is returned as
    /// a [`ScanError::Dependency`] naming the dependency and step.
    #[instrument(skip(self, change), fields(dependencies = change.len()))]
    pub async fn scan_change(&self, change: &DependencyChange) -> Result<ScanResult> {
        let mut result = ScanResult::default();

        for key in change {
            if self.options.ignore.should_ignore_package(&key.name) {
                debug!(dependency = %key, "ignored by configuration");
                continue;
            }

            match self.scan_package(key).await {
                Ok(scanned) => result.dependencies.push(scanned),
                Err(err) if self.options.batch_mode == BatchMode::SkipFailed => {
                    warn!(dependency = %key, error = %err, "skipping failed dependency");
                    result.failures.push(failure(key, err));
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            scanned = result.dependencies.len(),
            failed = result.failures.len(),
            findings = result.total_findings(),
            "scan complete"
        );
        Ok(result)
    }

    /// Diffs each lock file independently and scans the union of their changes.
    ///
    /// A malformed lock file is recorded as a failure of the diff step; the
    /// other lock files are still processed.
    pub async fn scan_lock_files(&self, files: &[LockFileChange]) -> Result<ScanResult> {
        let mut change = DependencyChange::default();
        let mut failures = Vec::new();

        for file in files {
            match file.diff() {
                Ok(diff) => {
                    info!(path = %file.path, format = %file.format.as_str(), added = diff.len(), "diffed lock file");
                    change.union(diff);
                }
                Err(err @ ScanError::MalformedLock { .. }) => {
                    warn!(path = %file.path, error = %err, "skipping malformed lock file");
                    failures.push(ScanFailure {
                        target: file.path.clone(),
                        step: Some(ScanStep::Diff),
                        message: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        let mut result = self.scan_change(&change).await?;
        failures.append(&mut result.failures);
        result.failures = failures;
        Ok(result)
    }
}

fn failure(key: &DependencyKey, err: ScanError) -> ScanFailure {
    let step = err.step();
    let message = match err {
        ScanError::Dependency { source, .. } => source.to_string(),
        other => other.to_string(),
    };
    ScanFailure {
        target: key.to_string(),
        step,
        message,
    }
}
