use serde::{Deserialize, Serialize};

use super::{DependencyKey, DownloadStats, GlobalUsage, PackageMetadata, RiskFinding, Severity};
use crate::error::ScanStep;

/// A source file the analyzer could not parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// Everything learned about one introduced dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannedDependency {
    pub name: String,
    pub version: String,
    pub metadata: PackageMetadata,
    pub downloads: DownloadStats,
    pub globals: GlobalUsage,
    pub findings: Vec<RiskFinding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_files: Vec<SkippedFile>,
}

impl ScannedDependency {
    pub fn key(&self) -> DependencyKey {
        DependencyKey::new(&self.name, &self.version)
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }
}

/// A dependency or lock file that could not be scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFailure {
    /// `name@version` for a dependency, the path for a lock file.
    pub target: String,
    /// Unset for errors raised outside a pipeline step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<ScanStep>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResult {
    pub dependencies: Vec<ScannedDependency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ScanFailure>,
}

impl ScanResult {
    pub fn new(dependencies: Vec<ScannedDependency>) -> Self {
        Self {
            dependencies,
            failures: Vec::new(),
        }
    }

    pub fn total_findings(&self) -> usize {
        self.dependencies.iter().map(|d| d.findings.len()).sum()
    }

    pub fn count_severity(&self, severity: Severity) -> usize {
        self.dependencies
            .iter()
            .flat_map(|d| &d.findings)
            .filter(|f| f.severity == severity)
            .count()
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.dependencies.iter().filter_map(|d| d.highest_severity()).max()
    }

    /// Dependencies ordered by finding count, highest first.
    pub fn ranked(&self) -> Vec<&ScannedDependency> {
        let mut ranked: Vec<&ScannedDependency> = self.dependencies.iter().collect();
        ranked.sort_by(|a, b| b.findings.len().cmp(&a.findings.len()));
        ranked
    }
}
