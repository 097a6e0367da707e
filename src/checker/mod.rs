//! Risk rules applied to one scanned package version.
//!
//! The rule set is closed: [`Rule`] lists every rule the tool knows. Each
//! rule looks at a [`RuleInput`] and produces at most one [`RiskFinding`].
//! Rules are pure; the evaluation instant is part of the input.

mod freshness;
mod globals;
mod keyword;
mod obfuscation;
mod popularity;

pub use globals::classify_global;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzer::SourceFile;
use crate::config::RulesConfig;
use crate::model::{DownloadStats, GlobalUsage, PackageMetadata, RiskFinding, RuleKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    Freshness,
    Popularity,
    DangerousGlobals,
    Obfuscation,
    Keyword,
}

impl Rule {
    pub const ALL: [Rule; 5] = [
        Rule::Freshness,
        Rule::Popularity,
        Rule::DangerousGlobals,
        Rule::Obfuscation,
        Rule::Keyword,
    ];

    pub fn kind(&self) -> RuleKind {
        match self {
            Rule::Freshness => RuleKind::Freshness,
            Rule::Popularity => RuleKind::Popularity,
            Rule::DangerousGlobals => RuleKind::DangerousGlobals,
            Rule::Obfuscation => RuleKind::Obfuscation,
            Rule::Keyword => RuleKind::Keyword,
        }
    }

    fn evaluate(&self, input: &RuleInput<'_>, config: &RulesConfig) -> Option<RiskFinding> {
        match self {
            Rule::Freshness => freshness::check(input, config.freshness_days),
            Rule::Popularity => popularity::check(input, config.popularity_threshold),
            Rule::DangerousGlobals => globals::check(input),
            Rule::Obfuscation => obfuscation::check(input),
            Rule::Keyword => keyword::check(input, &config.keywords),
        }
    }
}

/// Everything the rules may look at for one package version.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub name: &'a str,
    pub version: &'a str,
    pub metadata: &'a PackageMetadata,
    pub downloads: &'a DownloadStats,
    pub globals: &'a GlobalUsage,
    pub files: &'a [SourceFile],
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    config: RulesConfig,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>, config: RulesConfig) -> Self {
        Self { rules, config }
    }

    /// All rules with the configured thresholds.
    pub fn from_config(config: &RulesConfig) -> Self {
        Self::new(Rule::ALL.to_vec(), config.clone())
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Findings in rule order.
    pub fn evaluate(&self, input: &RuleInput<'_>) -> Vec<RiskFinding> {
        self.rules
            .iter()
            .filter_map(|rule| rule.evaluate(input, &self.config))
            .collect()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::from_config(&RulesConfig::default())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{Duration, NaiveDate, TimeZone};

    use super::*;

    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    /// Metadata whose `latest` tag is `latest`, published `age_days` before [`now`].
    pub fn metadata(name: &str, latest: &str, age_days: i64) -> PackageMetadata {
        let mut metadata = PackageMetadata {
            name: name.to_string(),
            ..PackageMetadata::default()
        };
        metadata.dist_tags.insert("latest".to_string(), latest.to_string());
        metadata
            .time
            .insert(latest.to_string(), now() - Duration::days(age_days));
        metadata
    }

    pub fn downloads(name: &str, downloads: u64) -> DownloadStats {
        DownloadStats {
            downloads,
            start: NaiveDate::from_ymd_opt(2024, 5, 25).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
            package: name.to_string(),
        }
    }

    pub struct Inputs {
        pub metadata: PackageMetadata,
        pub downloads: DownloadStats,
        pub globals: GlobalUsage,
        pub files: Vec<SourceFile>,
    }

    impl Inputs {
        pub fn new() -> Self {
            Self {
                metadata: metadata("pkg", "2.0.0", 365),
                downloads: downloads("pkg", 1_000_000),
                globals: GlobalUsage::new(),
                files: Vec::new(),
            }
        }

        pub fn input<'a>(&'a self, version: &'a str) -> RuleInput<'a> {
            RuleInput {
                name: &self.metadata.name,
                version,
                metadata: &self.metadata,
                downloads: &self.downloads,
                globals: &self.globals,
                files: &self.files,
                now: now(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::model::{Access, Severity};

    #[test]
    fn test_quiet_package_has_no_findings() {
        let inputs = Inputs::new();
        assert!(RuleSet::default().evaluate(&inputs.input("1.0.0")).is_empty());
    }

    #[test]
    fn test_findings_follow_rule_order() {
        let mut inputs = Inputs::new();
        inputs.metadata = metadata("pkg", "1.0.0", 2);
        inputs.downloads = downloads("pkg", 12);
        inputs.globals.record("fetch", Access::Read);
        inputs.files = vec![SourceFile::new(
            "package/index.js",
            "var _0xAB12CD = 1; window.ethereum;",
        )];

        let findings = RuleSet::default().evaluate(&inputs.input("1.0.0"));
        let kinds: Vec<RuleKind> = findings.iter().map(|f| f.rule).collect();

        assert_eq!(
            kinds,
            vec![
                RuleKind::Freshness,
                RuleKind::Popularity,
                RuleKind::DangerousGlobals,
                RuleKind::Obfuscation,
                RuleKind::Keyword,
            ]
        );
        assert_eq!(findings[2].severity, Severity::High);
    }

    #[test]
    fn test_subset_of_rules() {
        let mut inputs = Inputs::new();
        inputs.downloads = downloads("pkg", 12);
        inputs.globals.record("eval", Access::Read);

        let rules = RuleSet::new(vec![Rule::Popularity], RulesConfig::default());
        let findings = rules.evaluate(&inputs.input("1.0.0"));

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, RuleKind::Popularity);
    }

    #[test]
    fn test_thresholds_come_from_config() {
        let mut inputs = Inputs::new();
        inputs.downloads = downloads("pkg", 12);

        let config = RulesConfig {
            popularity_threshold: 10,
            ..RulesConfig::default()
        };
        assert!(RuleSet::from_config(&config).evaluate(&inputs.input("1.0.0")).is_empty());
    }
}
