//! Error taxonomy shared by every stage of a scan.
//!
//! Errors are classified by how the pipeline reacts to them:
//!
//! - [`ScanError::Transient`] is retried at collaborator boundaries
//!   (see [`crate::retry`]) and becomes a hard failure once retries run out.
//! - [`ScanError::NotFound`], [`ScanError::SizeLimitExceeded`] and the
//!   transport errors fail immediately.
//! - [`ScanError::ParseFailure`] is recorded by the analyzer and never aborts
//!   a package scan.
//! - [`ScanError::MalformedLock`] fails the diff of one lock file only.

use std::fmt;

use thiserror::Error;

use crate::lockfile::LockFormat;
use crate::model::DependencyKey;

pub type Result<T, E = ScanError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("{what} not found")]
    NotFound { what: String },

    #[error("transient failure fetching {what}: {message}")]
    Transient { what: String, message: String },

    #[error("extraction exceeded the size limit of {limit} bytes")]
    SizeLimitExceeded { limit: u64 },

    #[error("failed to parse {path}: {message}")]
    ParseFailure { path: String, message: String },

    #[error("malformed {format}: {message}")]
    MalformedLock { format: LockFormat, message: String },

    #[error("unexpected HTTP status {status} fetching {what}")]
    UnexpectedStatus { what: String, status: u16 },

    #[error("invalid response for {what}: {message}")]
    InvalidResponse { what: String, message: String },

    #[error("failed to read archive: {0}")]
    Io(#[from] std::io::Error),

    #[error("{key} failed during {step}: {source}")]
    Dependency {
        key: DependencyKey,
        step: ScanStep,
        #[source]
        source: Box<ScanError>,
    },
}

impl ScanError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ScanError::NotFound { what: what.into() }
    }

    pub fn transient(what: impl Into<String>, message: impl fmt::Display) -> Self {
        ScanError::Transient {
            what: what.into(),
            message: message.to_string(),
        }
    }

    pub fn malformed(format: LockFormat, message: impl Into<String>) -> Self {
        ScanError::MalformedLock {
            format,
            message: message.into(),
        }
    }

    /// Maps a reqwest failure onto the taxonomy.
    ///
    /// Connection problems and timeouts are transient; a body that cannot be
    /// decoded is not, since retrying the same upstream state yields the same
    /// bytes.
    pub fn from_http(what: impl Into<String>, err: reqwest::Error) -> Self {
        let what = what.into();
        if let Some(status) = err.status() {
            return ScanError::from_status(what, status);
        }
        if err.is_decode() {
            return ScanError::InvalidResponse {
                what,
                message: err.to_string(),
            };
        }
        ScanError::Transient {
            what,
            message: err.to_string(),
        }
    }

    /// Maps a non-success HTTP status onto the taxonomy.
    pub fn from_status(what: impl Into<String>, status: reqwest::StatusCode) -> Self {
        let what = what.into();
        if status == reqwest::StatusCode::NOT_FOUND {
            ScanError::NotFound { what }
        } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status == reqwest::StatusCode::REQUEST_TIMEOUT
            || status.is_server_error()
        {
            ScanError::Transient {
                what,
                message: format!("HTTP {}", status.as_u16()),
            }
        } else {
            ScanError::UnexpectedStatus {
                what,
                status: status.as_u16(),
            }
        }
    }

    /// Attaches the dependency and pipeline step a failure happened in.
    pub fn during(self, key: &DependencyKey, step: ScanStep) -> Self {
        ScanError::Dependency {
            key: key.clone(),
            step,
            source: Box::new(self),
        }
    }

    /// The pipeline step, for errors wrapped by [`ScanError::during`].
    pub fn step(&self) -> Option<ScanStep> {
        match self {
            ScanError::Dependency { step, .. } => Some(*step),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ScanError::Transient { .. })
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            ScanError::NotFound { .. } => true,
            ScanError::Dependency { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

/// The per-dependency pipeline stages that can fail, in execution order.
///
/// Analysis records unparseable files instead of failing and classification
/// cannot fail, so neither has a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanStep {
    Diff,
    FetchMetadata,
    FetchStats,
    FetchArchive,
    Extract,
}

impl ScanStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStep::Diff => "diff",
            ScanStep::FetchMetadata => "fetch-metadata",
            ScanStep::FetchStats => "fetch-stats",
            ScanStep::FetchArchive => "fetch-archive",
            ScanStep::Extract => "extract",
        }
    }
}

impl fmt::Display for ScanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(ScanError::from_status("x", reqwest::StatusCode::NOT_FOUND).is_not_found());
        assert!(ScanError::from_status("x", reqwest::StatusCode::BAD_GATEWAY).is_retryable());
        assert!(
            ScanError::from_status("x", reqwest::StatusCode::TOO_MANY_REQUESTS).is_retryable()
        );
        assert!(!ScanError::from_status("x", reqwest::StatusCode::FORBIDDEN).is_retryable());
    }

    #[test]
    fn test_dependency_error_names_step() {
        let key = DependencyKey::new("left-pad", "1.3.0");
        let err = ScanError::not_found("package left-pad").during(&key, ScanStep::FetchMetadata);

        assert_eq!(
            err.to_string(),
            "left-pad@1.3.0 failed during fetch-metadata: package left-pad not found"
        );
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
        assert_eq!(err.step(), Some(ScanStep::FetchMetadata));
        assert_eq!(ScanError::not_found("package left-pad").step(), None);
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(ScanError::transient("x", "connection reset").is_retryable());
        assert!(!ScanError::SizeLimitExceeded { limit: 1 }.is_retryable());
        assert!(!ScanError::malformed(LockFormat::Yarn, "bad").is_retryable());
    }
}
