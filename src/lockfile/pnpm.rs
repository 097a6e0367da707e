use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use tracing::debug;

use super::LockFormat;
use crate::error::{Result, ScanError};
use crate::model::{DependencyKey, DependencySet};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PnpmLock {
    lockfile_version: Option<Value>,
    #[serde(default)]
    packages: Option<BTreeMap<String, Value>>,
}

/// Parses the `packages:` section of a pnpm lock file (v5 through v9).
pub(super) fn parse(content: &str) -> Result<DependencySet> {
    let lock: PnpmLock = serde_yaml::from_str(content).map_err(|e| malformed(e.to_string()))?;

    let major = lock
        .lockfile_version
        .as_ref()
        .and_then(major_version)
        .ok_or_else(|| malformed("missing or invalid lockfileVersion"))?;

    let mut set = DependencySet::new();
    for key in lock.packages.unwrap_or_default().keys() {
        if let Some(dependency) = normalize_key(key, major)? {
            set.insert(dependency);
        }
    }
    Ok(set)
}

fn major_version(value: &Value) -> Option<u32> {
    let version = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Some(version.trunc() as u32)
}

/// Normalizes a `packages:` key into a dependency.
///
/// - v5: `/name/1.0.0` or `/name/1.0.0_peer@2.0.0`
/// - v6: `/name@1.0.0(peer@2.0.0)`
/// - v9: `name@1.0.0(peer@2.0.0)`
///
/// Keys resolved from a local path or other non-registry protocol return `None`,
/// as do v6+ git and tarball keys such as `github.com/user/repo/abc123`.
fn normalize_key(key: &str, major: u32) -> Result<Option<DependencyKey>> {
    let trimmed = key.trim_start_matches('/');
    let trimmed = match trimmed.find('(') {
        Some(paren) => &trimmed[..paren],
        None => trimmed,
    };

    let (name, version) = if major < 6 {
        let Some((name, version)) = trimmed.rsplit_once('/') else {
            return Err(malformed(format!("package key `{}` has no version", key)));
        };
        let version = match version.find('_') {
            Some(underscore) => &version[..underscore],
            None => version,
        };
        (name, version)
    } else {
        match trimmed.rfind('@') {
            Some(at) if at > 0 => (&trimmed[..at], &trimmed[at + 1..]),
            _ if trimmed.contains('/') => {
                debug!(key, "skipping git or tarball package");
                return Ok(None);
            }
            _ => return Err(malformed(format!("package key `{}` has no version", key))),
        }
    };

    if name.is_empty() || version.is_empty() {
        return Err(malformed(format!("package key `{}` has no version", key)));
    }
    if version.contains(':') {
        debug!(key, "skipping non-registry package");
        return Ok(None);
    }

    Ok(Some(DependencyKey::new(name, version)))
}

fn malformed(message: impl Into<String>) -> ScanError {
    ScanError::malformed(LockFormat::Pnpm, message)
}
