use super::RuleInput;
use crate::model::{RiskFinding, RuleKind, Severity};

/// Flags every file containing one of `keywords` as a plain substring.
pub(super) fn check(input: &RuleInput<'_>, keywords: &[String]) -> Option<RiskFinding> {
    let mut hits = Vec::new();
    for file in input.files {
        for keyword in keywords.iter().filter(|k| !k.is_empty()) {
            if file.text.contains(keyword.as_str()) {
                hits.push(format!("- {} uses {}", file.path, keyword));
            }
        }
    }

    if hits.is_empty() {
        return None;
    }

    Some(RiskFinding::new(
        RuleKind::Keyword,
        Severity::Low,
        "matches a keyword rule",
        hits.join("\n"),
    ))
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::analyzer::SourceFile;

    fn keywords(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_lists_each_matching_file() {
        let mut inputs = Inputs::new();
        inputs.files = vec![
            SourceFile::new("package/a.js", "window.ethereum.request()"),
            SourceFile::new("package/b.js", "console.log(1)"),
            SourceFile::new("package/c.js", "if (ethereum) {}"),
        ];

        let finding = check(&inputs.input("1.0.0"), &keywords(&["ethereum"])).unwrap();
        assert_eq!(finding.severity, Severity::Low);
        assert_eq!(finding.evidence, "- package/a.js uses ethereum\n- package/c.js uses ethereum");
    }

    #[test]
    fn test_no_match_or_no_keywords() {
        let mut inputs = Inputs::new();
        inputs.files = vec![SourceFile::new("package/a.js", "solana")];

        assert!(check(&inputs.input("1.0.0"), &keywords(&["ethereum"])).is_none());
        assert!(check(&inputs.input("1.0.0"), &keywords(&[""])).is_none());
        assert!(check(&inputs.input("1.0.0"), &[]).is_none());
    }
}
