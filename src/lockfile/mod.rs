//! Lock-file parsing and dependency diffing.
//!
//! Both supported formats normalize into the same [`DependencySet`], so
//! [`diff`] never needs to know where a set came from.
//!
//! | Format | File name | Entry keys |
//! |--------|-----------|------------|
//! | [`LockFormat::Yarn`] | `yarn.lock` | `"name@range, name@range2":` (v1 and berry) |
//! | [`LockFormat::Pnpm`] | `pnpm-lock.yaml` | `/name/1.0.0`, `/name@1.0.0(peer@2.0.0)`, `name@1.0.0` |
//!
//! # Example
//!
//! ```
//! use prscan::lockfile::{diff_contents, LockFormat};
//!
//! let old = "lodash@^4.17.20:\n  version \"4.17.20\"\n";
//! let new = "lodash@^4.17.21:\n  version \"4.17.21\"\n";
//!
//! let change = diff_contents(LockFormat::Yarn, Some(old), new).unwrap();
//! assert_eq!(change.iter().next().unwrap().to_string(), "lodash@4.17.21");
//! ```

mod pnpm;
mod yarn;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::model::{DependencyChange, DependencySet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockFormat {
    Yarn,
    Pnpm,
}

impl LockFormat {
    /// Detects the format from the final path component, in any directory.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        match path.as_ref().file_name()?.to_str()? {
            "yarn.lock" => Some(LockFormat::Yarn),
            "pnpm-lock.yaml" => Some(LockFormat::Pnpm),
            _ => None,
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            LockFormat::Yarn => "yarn.lock",
            LockFormat::Pnpm => "pnpm-lock.yaml",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LockFormat::Yarn => "yarn",
            LockFormat::Pnpm => "pnpm",
        }
    }
}

impl std::fmt::Display for LockFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

impl std::str::FromStr for LockFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yarn" | "yarn.lock" => Ok(LockFormat::Yarn),
            "pnpm" | "pnpm-lock.yaml" => Ok(LockFormat::Pnpm),
            _ => Err(format!("Unknown lock format: {}. Use 'yarn' or 'pnpm'", s)),
        }
    }
}

/// Two revisions of one lock file touched by a change request.
#[derive(Debug, Clone)]
pub struct LockFileChange {
    pub path: String,
    pub format: LockFormat,
    /// `None` when the change adds the lock file.
    pub old: Option<String>,
    pub new: String,
}

impl LockFileChange {
    pub fn new(path: impl Into<String>, format: LockFormat, old: Option<String>, new: String) -> Self {
        Self {
            path: path.into(),
            format,
            old,
            new,
        }
    }

    pub fn diff(&self) -> Result<DependencyChange> {
        diff_contents(self.format, self.old.as_deref(), &self.new)
    }
}

pub fn parse(format: LockFormat, content: &str) -> Result<DependencySet> {
    match format {
        LockFormat::Yarn => yarn::parse(content),
        LockFormat::Pnpm => pnpm::parse(content),
    }
}

/// `new - old`: every `name@version` present in `new` but not in `old`.
pub fn diff(old: &DependencySet, new: &DependencySet) -> DependencyChange {
    new.difference(old)
}

/// Parses both revisions and diffs them. A missing `old` revision means
/// every entry of `new` was introduced.
pub fn diff_contents(format: LockFormat, old: Option<&str>, new: &str) -> Result<DependencyChange> {
    let new = parse(format, new)?;
    match old {
        Some(old) => Ok(diff(&parse(format, old)?, &new)),
        None => Ok(DependencyChange::all(new)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DependencyKey;

    const YARN_OLD: &str = r#"# yarn lockfile v1

"@babel/code-frame@^7.0.0", "@babel/code-frame@^7.10.4":
  version "7.10.4"
  resolved "https://registry.yarnpkg.com/@babel/code-frame/-/code-frame-7.10.4.tgz"

left-pad@^1.3.0:
  version "1.3.0"

removed-pkg@^2.0.0:
  version "2.0.0"
"#;

    const YARN_NEW: &str = r#"# yarn lockfile v1

"@babel/code-frame@^7.0.0", "@babel/code-frame@^7.10.4":
  version "7.12.13"

left-pad@^1.3.0:
  version "1.3.0"

is-odd@^3.0.1:
  version "3.0.1"
"#;

    #[test]
    fn test_from_path() {
        assert_eq!(LockFormat::from_path("yarn.lock"), Some(LockFormat::Yarn));
        assert_eq!(LockFormat::from_path("packages/web/pnpm-lock.yaml"), Some(LockFormat::Pnpm));
        assert_eq!(LockFormat::from_path("package-lock.json"), None);
        assert_eq!(LockFormat::from_path("yarn.lock.bak"), None);
    }

    #[test]
    fn test_diff_reports_upgrades_and_additions_only() {
        let change = diff_contents(LockFormat::Yarn, Some(YARN_OLD), YARN_NEW).unwrap();
        let keys: Vec<String> = change.iter().map(|k| k.to_string()).collect();

        assert_eq!(keys, vec!["@babel/code-frame@7.12.13", "is-odd@3.0.1"]);
    }

    #[test]
    fn test_diff_is_subset_of_new_and_disjoint_from_old() {
        let old = parse(LockFormat::Yarn, YARN_OLD).unwrap();
        let new = parse(LockFormat::Yarn, YARN_NEW).unwrap();
        let change = diff(&old, &new);

        for key in &change {
            assert!(new.contains(key));
            assert!(!old.contains(key));
        }
    }

    #[test]
    fn test_added_lock_file_reports_everything() {
        let change = diff_contents(LockFormat::Yarn, None, YARN_NEW).unwrap();
        assert_eq!(change.len(), 3);
        assert!(change.contains(&DependencyKey::new("left-pad", "1.3.0")));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let first = parse(LockFormat::Yarn, YARN_NEW).unwrap();
        let second = parse(LockFormat::Yarn, YARN_NEW).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_identical_revisions_have_no_change() {
        let change = diff_contents(LockFormat::Yarn, Some(YARN_NEW), YARN_NEW).unwrap();
        assert!(change.is_empty());
    }

    #[test]
    fn test_lock_file_change_diff() {
        let change = LockFileChange::new(
            "pnpm-lock.yaml",
            LockFormat::Pnpm,
            None,
            "lockfileVersion: '9.0'\npackages:\n  is-odd@3.0.1:\n    resolution: {integrity: sha512-x}\n".to_string(),
        );

        let keys: Vec<String> = change.diff().unwrap().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["is-odd@3.0.1"]);
    }
}
