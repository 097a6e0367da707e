use tracing::debug;

use super::LockFormat;
use crate::error::{Result, ScanError};
use crate::model::{DependencyKey, DependencySet};

const METADATA_ENTRY: &str = "__metadata";

/// Protocols resolving to code inside the repository rather than the registry.
const LOCAL_PROTOCOLS: &[&str] = &["workspace", "link", "portal", "file"];

struct Entry {
    key: String,
    line: usize,
    version: Option<String>,
}

/// Parses a yarn v1 or berry lock file.
///
/// Both generations share the shape this needs: unindented entry keys ending
/// in `:` and a two-space indented `version` field.
pub(super) fn parse(content: &str) -> Result<DependencySet> {
    let mut set = DependencySet::new();
    let mut current: Option<Entry> = None;

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim_end();
        let number = index + 1;
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }

        if !line.starts_with(' ') {
            let Some(key) = line.strip_suffix(':') else {
                return Err(malformed(number, format!("expected an entry key, found `{}`", line)));
            };
            if let Some(entry) = current.take() {
                finish(entry, &mut set)?;
            }
            current = Some(Entry {
                key: key.to_string(),
                line: number,
                version: None,
            });
            continue;
        }

        let Some(entry) = current.as_mut() else {
            return Err(malformed(number, "indented line before the first entry"));
        };
        if let Some(version) = version_field(line) {
            entry.version.get_or_insert(version);
        }
    }

    if let Some(entry) = current {
        finish(entry, &mut set)?;
    }
    Ok(set)
}

fn finish(entry: Entry, set: &mut DependencySet) -> Result<()> {
    let specifier = first_specifier(&entry.key);
    if specifier == METADATA_ENTRY {
        return Ok(());
    }
    if is_local(specifier) {
        debug!(entry = specifier, "skipping local workspace entry");
        return Ok(());
    }

    let version = entry
        .version
        .ok_or_else(|| malformed(entry.line, format!("entry `{}` has no version", entry.key)))?;
    set.insert(DependencyKey::new(package_name(specifier), version));
    Ok(())
}

/// `version "1.0.0"` (v1) or `version: 1.0.0` (berry), direct children only.
fn version_field(line: &str) -> Option<String> {
    let body = line.strip_prefix("  ")?;
    if body.starts_with(' ') {
        return None;
    }
    let rest = body.strip_prefix("version")?;
    let rest = match rest.strip_prefix(':') {
        Some(rest) => rest,
        None if rest.starts_with(' ') => rest,
        None => return None,
    };
    let value = unquote(rest.trim());
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn first_specifier(key: &str) -> &str {
    let first = key.split(',').next().unwrap_or(key);
    unquote(first.trim())
}

fn unquote(value: &str) -> &str {
    value.trim_matches('"').trim_matches('\'')
}

fn is_local(specifier: &str) -> bool {
    let Some((_, range)) = split_specifier(specifier) else {
        return false;
    };
    match range.split_once(':') {
        Some((protocol, _)) => LOCAL_PROTOCOLS.contains(&protocol),
        None => false,
    }
}

/// `name@range` -> (`name`, `range`); the leading `@` of a scope is not a separator.
fn split_specifier(specifier: &str) -> Option<(&str, &str)> {
    match specifier.rfind('@') {
        Some(at) if at > 0 => Some((&specifier[..at], &specifier[at + 1..])),
        _ => None,
    }
}

/// Package name of a specifier.
///
/// The `:protocol` part and the trailing `@range` are dropped. An npm alias
/// (`alias@npm:real@^1`) resolves to the aliased package, which is what the
/// registry actually serves.
fn package_name(specifier: &str) -> String {
    let (head, protocol_rest) = match specifier.split_once(':') {
        Some((head, rest)) => (head, Some(rest)),
        None => (specifier, None),
    };

    if head.ends_with("@npm") {
        if let Some((real, _)) = protocol_rest.and_then(split_specifier) {
            return real.to_string();
        }
    }

    match split_specifier(head) {
        Some((name, _)) => name.to_string(),
        None => head.to_string(),
    }
}

fn malformed(line: usize, message: impl std::fmt::Display) -> ScanError {
    ScanError::malformed(LockFormat::Yarn, format!("line {}: {}", line, message))
}
