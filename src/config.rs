//! Configuration file handling.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/prscan/config.toml`
//! - macOS: `~/Library/Application Support/prscan/config.toml`
//! - Windows: `%APPDATA%\prscan\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! batch_mode = "skip-failed"
//! default_format = "table"
//!
//! [registry]
//! download_period = "last-month"
//!
//! [rules]
//! freshness_days = 14
//! keywords = ["ethereum", "mnemonic"]
//!
//! [ignore]
//! packages = ["@types/*"]
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::ExtractionLimits;
use crate::model::DownloadPeriod;
use crate::scanner::BatchMode;

/// Application configuration.
///
/// Every section falls back to its defaults, so a partial file is valid.
///
/// # Example
///
/// ```no_run
/// use prscan::Config;
///
/// let config = Config::load().unwrap();
/// println!("Popularity threshold: {}", config.rules.popularity_threshold);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// What a batch scan does when one dependency fails.
    ///
    /// Default: fail-fast
    pub batch_mode: BatchMode,

    /// Default output format when no `--format` flag is provided.
    ///
    /// Valid values: "table", "json"
    /// Default: "table"
    pub default_format: String,

    pub registry: RegistryConfig,
    pub github: GitHubConfig,
    pub extraction: ExtractionConfig,
    pub rules: RulesConfig,

    /// Ignore list for packages that should never be scanned.
    pub ignore: IgnoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub registry_url: String,
    pub downloads_url: String,
    /// Window the popularity rule looks at.
    pub download_period: DownloadPeriod,
    /// Attempts per metadata or download-stats request.
    pub max_retries: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry_url: "https://registry.npmjs.org".to_string(),
            downloads_url: "https://api.npmjs.org/downloads".to_string(),
            download_period: DownloadPeriod::LastWeek,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_url: String,
    pub raw_url: String,
    pub max_retries: u32,
    /// Page size for the changed-files listing.
    pub per_page: u32,
    /// Falls back to `GITHUB_TOKEN` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            raw_url: "https://raw.githubusercontent.com".to_string(),
            max_retries: 3,
            per_page: 100,
            token: None,
        }
    }
}

impl GitHubConfig {
    pub fn token(&self) -> Option<String> {
        self.token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub max_file_size: u64,
    pub max_total_size: u64,
    /// File extensions handed to the analyzer.
    pub extensions: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        let limits = ExtractionLimits::default();
        Self {
            max_file_size: limits.max_file_size,
            max_total_size: limits.max_total_size,
            extensions: vec![".js".to_string(), ".mjs".to_string(), ".cjs".to_string()],
        }
    }
}

impl ExtractionConfig {
    pub fn limits(&self) -> ExtractionLimits {
        ExtractionLimits {
            max_file_size: self.max_file_size,
            max_total_size: self.max_total_size,
        }
    }
}

/// Thresholds for the risk rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// A latest version published fewer than this many days ago is fresh.
    pub freshness_days: u32,
    /// Fewer downloads than this in the configured window is unpopular.
    pub popularity_threshold: u64,
    /// Substrings that flag a source file.
    pub keywords: Vec<String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            freshness_days: 30,
            popularity_threshold: 10_000,
            keywords: vec!["ethereum".to_string()],
        }
    }
}

/// Packages to skip entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Package names excluded from scanning.
    ///
    /// Supports glob patterns (e.g., "lodash*", "@types/*").
    pub packages: Vec<String>,
}

impl IgnoreConfig {
    /// Check if a package should be ignored.
    pub fn should_ignore_package(&self, name: &str) -> bool {
        self.packages.iter().any(|pattern| {
            if pattern.contains('*') {
                glob_match(pattern, name)
            } else {
                pattern == name
            }
        })
    }
}

/// Simple glob matching (supports * as wildcard).
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();

    if parts.len() == 1 {
        return pattern == text;
    }

    let mut remaining = text;

    if !parts[0].is_empty() {
        if !remaining.starts_with(parts[0]) {
            return false;
        }
        remaining = &remaining[parts[0].len()..];
    }

    let last_part = parts[parts.len() - 1];
    if !last_part.is_empty() {
        if !remaining.ends_with(last_part) {
            return false;
        }
        remaining = &remaining[..remaining.len() - last_part.len()];
    }

    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match remaining.find(part) {
            Some(pos) => remaining = &remaining[pos + part.len()..],
            None => return false,
        }
    }

    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_mode: BatchMode::default(),
            default_format: "table".to_string(),
            registry: RegistryConfig::default(),
            github: GitHubConfig::default(),
            extraction: ExtractionConfig::default(),
            rules: RulesConfig::default(),
            ignore: IgnoreConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the config file, or defaults if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves the configuration, creating the parent directory if needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("prscan")
            .join("config.toml")
    }

    /// The default configuration rendered as TOML.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_glob_match_exact() {
        assert!(glob_match("lodash", "lodash"));
        assert!(!glob_match("lodash", "underscore"));
    }

    #[test]
    fn test_glob_match_prefix() {
        assert!(glob_match("lodash*", "lodash"));
        assert!(glob_match("lodash*", "lodash.debounce"));
        assert!(!glob_match("lodash*", "underscore"));
    }

    #[test]
    fn test_glob_match_suffix_and_middle() {
        assert!(glob_match("*-cli", "typescript-cli"));
        assert!(!glob_match("*-cli", "typescript"));
        assert!(glob_match("*lodash*", "my-lodash-plugin"));
    }

    #[test]
    fn test_glob_match_scoped() {
        assert!(glob_match("@types/*", "@types/node"));
        assert!(!glob_match("@types/*", "@babel/core"));
    }

    #[test]
    fn test_ignore_config_packages() {
        let config = IgnoreConfig {
            packages: vec!["lodash".to_string(), "@types/*".to_string()],
        };

        assert!(config.should_ignore_package("lodash"));
        assert!(config.should_ignore_package("@types/react"));
        assert!(!config.should_ignore_package("lodash-es"));
        assert!(!config.should_ignore_package("@babel/core"));
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.batch_mode, BatchMode::FailFast);
        assert_eq!(config.default_format, "table");
        assert_eq!(config.registry.download_period, DownloadPeriod::LastWeek);
        assert_eq!(config.registry.max_retries, 3);
        assert_eq!(config.github.per_page, 100);
        assert_eq!(config.extraction.limits(), ExtractionLimits::default());
        assert_eq!(config.rules.freshness_days, 30);
        assert_eq!(config.rules.popularity_threshold, 10_000);
        assert_eq!(config.rules.keywords, vec!["ethereum"]);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
batch_mode = "skip-failed"

[rules]
freshness_days = 7
"#,
        )
        .unwrap();

        assert_eq!(config.batch_mode, BatchMode::SkipFailed);
        assert_eq!(config.rules.freshness_days, 7);
        assert_eq!(config.rules.popularity_threshold, 10_000);
        assert_eq!(config.registry.registry_url, "https://registry.npmjs.org");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.ignore.packages.push("@types/*".to_string());
        config.registry.download_period = DownloadPeriod::LastMonth;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.ignore.packages, vec!["@types/*"]);
        assert_eq!(loaded.registry.download_period, DownloadPeriod::LastMonth);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.default_format, "table");
    }

    #[test]
    fn test_generated_default_parses() {
        let rendered = Config::generate_default_config();
        assert!(rendered.contains("[rules]"));
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.rules, RulesConfig::default());
    }
}
