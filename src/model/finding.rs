use serde::{Deserialize, Serialize};

use super::Access;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low = 1,
    Medium = 2,
    High = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(format!("Unknown severity: {}. Use 'low', 'medium', or 'high'", s)),
        }
    }
}

/// Which rule produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    Freshness,
    Popularity,
    DangerousGlobals,
    Obfuscation,
    Keyword,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Freshness => "freshness",
            RuleKind::Popularity => "popularity",
            RuleKind::DangerousGlobals => "dangerous-globals",
            RuleKind::Obfuscation => "obfuscation",
            RuleKind::Keyword => "keyword",
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability a dangerous global grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GlobalCategory {
    Network,
    Dom,
    CodeExecution,
    LocalStorage,
    ExtensionApi,
}

impl GlobalCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            GlobalCategory::Network => "network request",
            GlobalCategory::Dom => "DOM access",
            GlobalCategory::CodeExecution => "dynamic code execution",
            GlobalCategory::LocalStorage => "local storage",
            GlobalCategory::ExtensionApi => "chrome extension API",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            GlobalCategory::Network => "can send network requests, possibly exfiltrating data",
            GlobalCategory::Dom => "can read sensitive page content such as wallet mnemonics",
            GlobalCategory::CodeExecution => "can execute arbitrary code",
            GlobalCategory::LocalStorage => "can read data the user stored locally",
            GlobalCategory::ExtensionApi => "can call browser extension APIs",
        }
    }
}

/// A global name that made the dangerous-globals rule fire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlaggedGlobal {
    pub name: String,
    pub access: Access,
    pub category: GlobalCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFinding {
    pub rule: RuleKind,
    pub severity: Severity,
    pub description: String,
    pub evidence: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flagged: Vec<FlaggedGlobal>,
}

impl RiskFinding {
    pub fn new(
        rule: RuleKind,
        severity: Severity,
        description: impl Into<String>,
        evidence: impl Into<String>,
    ) -> Self {
        Self {
            rule,
            severity,
            description: description.into(),
            evidence: evidence.into(),
            flagged: Vec::new(),
        }
    }

    pub fn with_flagged(mut self, flagged: Vec<FlaggedGlobal>) -> Self {
        self.flagged = flagged;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("HIGH".parse::<Severity>(), Ok(Severity::High));
        assert!("critical".parse::<Severity>().is_err());
    }

    #[test]
    fn test_finding_serialization_omits_empty_flagged() {
        let finding = RiskFinding::new(RuleKind::Keyword, Severity::Low, "keyword", "- index.js");
        let json = serde_json::to_value(&finding).unwrap();

        assert_eq!(json["rule"], "keyword");
        assert_eq!(json["severity"], "low");
        assert!(json.get("flagged").is_none());
    }
}
