use tracing::{debug, info, instrument};

use super::Scanner;
use crate::error::{Result, ScanError};
use crate::github::{ChangedFile, CodeHost, FileStatus, PullRequestRef, RepoRef};
use crate::lockfile::{LockFileChange, LockFormat};
use crate::model::ScanResult;

impl Scanner {
    /// Scans the lock files a pull request touches.
    ///
    /// New content is read at the head revision and old content at the base
    /// revision. Added lock files have no old content, so every entry counts
    /// as introduced; removed lock files are ignored.
    ///
    /// # Errors
    ///
    /// A lock file that no retrieval method can read is
    /// [`ScanError::NotFound`].
    #[instrument(skip(self, host, pr), fields(pr = %pr))]
    pub async fn scan_pull_request(&self, host: &dyn CodeHost, pr: &PullRequestRef) -> Result<ScanResult> {
        let pull = host.pull_request(pr).await?;
        let changed = host.changed_files(pr).await?;
        debug!(files = changed.len(), head = %pull.head.sha, base = %pull.base.sha, "listed changed files");

        let mut locks = Vec::new();
        for file in changed {
            if file.status == FileStatus::Removed {
                continue;
            }
            let Some(format) = LockFormat::from_path(&file.filename) else {
                continue;
            };

            info!(path = %file.filename, status = ?file.status, "found changed lock file");
            let new = fetch(host, &pr.repo, &file.filename, &pull.head.sha).await?;
            let old = match base_path(&file, format) {
                Some(path) => Some(fetch(host, &pr.repo, path, &pull.base.sha).await?),
                None => None,
            };

            locks.push(LockFileChange::new(file.filename, format, old, new));
        }

        if locks.is_empty() {
            info!("pull request does not change any lock file");
        }
        self.scan_lock_files(&locks).await
    }
}

/// Where the base revision of a changed lock file lives, if it has one.
fn base_path(file: &ChangedFile, format: LockFormat) -> Option<&str> {
    match file.status {
        FileStatus::Added => None,
        FileStatus::Renamed | FileStatus::Copied => {
            let previous = file.previous_filename.as_deref()?;
            (LockFormat::from_path(previous) == Some(format)).then_some(previous)
        }
        _ => Some(file.filename.as_str()),
    }
}

async fn fetch(host: &dyn CodeHost, repo: &RepoRef, path: &str, revision: &str) -> Result<String> {
    host.file_content(repo, path, revision)
        .await?
        .ok_or_else(|| ScanError::not_found(format!("{}/{} at {}", repo, path, revision)))
}
