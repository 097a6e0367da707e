//! Code-hosting collaborator: pull request metadata and file contents.

mod client;
mod content;

pub use client::GitHubClient;
pub use content::ContentStrategy;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub repo: RepoRef,
    pub number: u64,
}

impl PullRequestRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        Self {
            repo: RepoRef::new(owner, repo),
            number,
        }
    }
}

impl fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repo, self.number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    pub sha: String,
}

/// The parts of a pull request the scanner needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub head: CommitRef,
    pub base: CommitRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Removed,
    Modified,
    Renamed,
    Copied,
    Changed,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub filename: String,
    pub status: FileStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_filename: Option<String>,
}

#[async_trait]
pub trait CodeHost: Send + Sync {
    async fn pull_request(&self, pr: &PullRequestRef) -> Result<PullRequest>;

    /// Every file the pull request touches, across all pages.
    async fn changed_files(&self, pr: &PullRequestRef) -> Result<Vec<ChangedFile>>;

    /// Text of `path` at `revision`, or `None` if no retrieval method found it.
    async fn file_content(&self, repo: &RepoRef, path: &str, revision: &str) -> Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let pr = PullRequestRef::new("acme", "web", 42);
        assert_eq!(pr.to_string(), "acme/web#42");
    }

    #[test]
    fn test_changed_file_deserialization() {
        let file: ChangedFile = serde_json::from_str(
            r#"{"sha":"abc","filename":"yarn.lock","status":"renamed","previous_filename":"old/yarn.lock","additions":1}"#,
        )
        .unwrap();

        assert_eq!(file.status, FileStatus::Renamed);
        assert_eq!(file.previous_filename.as_deref(), Some("old/yarn.lock"));
    }
}
