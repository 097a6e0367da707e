use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Registry record for a package name.
///
/// Only the fields the pipeline reads are kept; everything else in the
/// registry document is ignored on deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: BTreeMap<String, String>,
    /// Publish time per version, plus the registry's `created`/`modified` keys.
    #[serde(default, deserialize_with = "timestamps")]
    pub time: BTreeMap<String, DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub versions: BTreeMap<String, VersionInfo>,
}

impl PackageMetadata {
    /// The version the `latest` dist-tag points at.
    pub fn latest(&self) -> Option<&str> {
        self.dist_tags.get("latest").map(String::as_str)
    }

    pub fn published_at(&self, version: &str) -> Option<DateTime<Utc>> {
        self.time.get(version).copied()
    }

    pub fn version(&self, version: &str) -> Option<&VersionInfo> {
        self.versions.get(version)
    }

    pub fn tarball(&self, version: &str) -> Option<&str> {
        self.versions.get(version).map(|v| v.dist.tarball.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub dist: Dist,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dist {
    pub tarball: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shasum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unpacked_size: Option<u64>,
}

// Unpublished packages carry an object under `time.unpublished`; keep only
// entries that are actual timestamps.
fn timestamps<'de, D>(deserializer: D) -> Result<BTreeMap<String, DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| {
            let stamp = value.as_str()?.parse::<DateTime<Utc>>().ok()?;
            Some((key, stamp))
        })
        .collect())
}

/// Aggregate download count over a trailing window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadStats {
    pub downloads: u64,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub package: String,
}

/// Trailing windows supported by the downloads API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DownloadPeriod {
    LastDay,
    #[default]
    LastWeek,
    LastMonth,
    LastYear,
}

impl DownloadPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadPeriod::LastDay => "last-day",
            DownloadPeriod::LastWeek => "last-week",
            DownloadPeriod::LastMonth => "last-month",
            DownloadPeriod::LastYear => "last-year",
        }
    }
}

impl std::fmt::Display for DownloadPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

/// One archive entry. Only [`EntryKind::File`] entries carry content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    pub path: String,
    pub content: Vec<u8>,
    pub size: u64,
    pub kind: EntryKind,
}

impl ExtractedFile {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA: &str = r#"{
        "_id": "left-pad",
        "name": "left-pad",
        "description": "String left pad",
        "dist-tags": { "latest": "1.3.0" },
        "time": {
            "created": "2014-03-14T01:34:30.163Z",
            "1.3.0": "2018-04-09T02:14:42.396Z",
            "unpublished": { "time": "2020-01-01T00:00:00.000Z" }
        },
        "versions": {
            "1.3.0": {
                "name": "left-pad",
                "version": "1.3.0",
                "dist": {
                    "tarball": "https://registry.npmjs.org/left-pad/-/left-pad-1.3.0.tgz",
                    "shasum": "5b8a3a7765dfe001261dde915589e782f8c94d1e",
                    "fileCount": 10
                }
            }
        }
    }"#;

    #[test]
    fn test_metadata_from_registry_document() {
        let meta: PackageMetadata = serde_json::from_str(METADATA).unwrap();

        assert_eq!(meta.latest(), Some("1.3.0"));
        assert_eq!(
            meta.tarball("1.3.0"),
            Some("https://registry.npmjs.org/left-pad/-/left-pad-1.3.0.tgz")
        );
        assert!(meta.published_at("1.3.0").is_some());
        assert!(!meta.time.contains_key("unpublished"));
        assert_eq!(meta.version("1.3.0").and_then(|v| v.dist.file_count), Some(10));
        assert!(meta.tarball("9.9.9").is_none());
    }

    #[test]
    fn test_download_stats_from_api_document() {
        let stats: DownloadStats = serde_json::from_str(
            r#"{"downloads":1234,"start":"2024-06-01","end":"2024-06-07","package":"left-pad"}"#,
        )
        .unwrap();

        assert_eq!(stats.downloads, 1234);
        assert_eq!(stats.start, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    }

    #[test]
    fn test_download_period_names() {
        assert_eq!(DownloadPeriod::default().as_str(), "last-week");
        let period: DownloadPeriod = serde_json::from_str("\"last-month\"").unwrap();
        assert_eq!(period, DownloadPeriod::LastMonth);
    }
}
