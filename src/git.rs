//! Lock file changes between two revisions of a local git checkout.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Command;
use tracing::{debug, info, warn};

use crate::lockfile::{LockFileChange, LockFormat};

/// One record of `git diff --name-status`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DiffEntry {
    status: char,
    path: String,
    /// Source path of a rename or copy.
    previous: Option<String>,
}

/// Reads every yarn or pnpm lock file that differs between `base` and `head`
/// in the checkout at `repo`.
///
/// Lock files deleted by `head` are ignored and added ones have no old
/// content. A renamed lock file is compared with its previous path when that
/// path has the same format.
pub fn changed_lock_files(repo: &Path, base: &str, head: &str) -> Result<Vec<LockFileChange>> {
    let listing = git(
        repo,
        &["diff", "--name-status", "-z", "--find-renames", base, head, "--"],
    )?;

    let mut locks = Vec::new();
    for entry in parse_name_status(&listing)? {
        if entry.path.ends_with("package-lock.json") {
            warn!(path = %entry.path, "package-lock.json is not supported, skipping");
            continue;
        }
        let Some(format) = LockFormat::from_path(&entry.path) else {
            continue;
        };
        if entry.status == 'D' {
            debug!(path = %entry.path, "lock file removed");
            continue;
        }

        info!(path = %entry.path, status = %entry.status, "found changed lock file");
        let new = show(repo, head, &entry.path)?;
        let old = match base_path(&entry, format) {
            Some(path) => Some(show(repo, base, path)?),
            None => None,
        };
        locks.push(LockFileChange::new(entry.path, format, old, new));
    }

    Ok(locks)
}

fn base_path(entry: &DiffEntry, format: LockFormat) -> Option<&str> {
    match entry.status {
        'A' => None,
        'R' | 'C' => {
            let previous = entry.previous.as_deref()?;
            (LockFormat::from_path(previous) == Some(format)).then_some(previous)
        }
        _ => Some(entry.path.as_str()),
    }
}

/// Parses `git diff --name-status -z` output: a status field followed by one
/// path, or by source and destination paths for renames and copies.
fn parse_name_status(listing: &str) -> Result<Vec<DiffEntry>> {
    let mut fields = listing.split('\0').filter(|f| !f.is_empty());
    let mut entries = Vec::new();

    while let Some(status) = fields.next() {
        let Some(kind) = status.chars().next() else {
            continue;
        };
        let first = fields
            .next()
            .with_context(|| format!("git diff record `{}` has no path", status))?;

        let entry = if matches!(kind, 'R' | 'C') {
            let path = fields
                .next()
                .with_context(|| format!("git diff record `{}` has no destination", status))?;
            DiffEntry {
                status: kind,
                path: path.to_string(),
                previous: Some(first.to_string()),
            }
        } else {
            DiffEntry {
                status: kind,
                path: first.to_string(),
                previous: None,
            }
        };
        entries.push(entry);
    }

    Ok(entries)
}

fn show(repo: &Path, revision: &str, path: &str) -> Result<String> {
    let object = format!("{}:{}", revision, path);
    git(repo, &["show", object.as_str()])
}

fn git(repo: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .context("Failed to execute git. Is git installed?")?;

    if !output.status.success() {
        bail!(
            "git {} failed in {}: {}",
            args.join(" "),
            repo.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    String::from_utf8(output.stdout)
        .with_context(|| format!("git {} printed invalid UTF-8", args.join(" ")))
}
