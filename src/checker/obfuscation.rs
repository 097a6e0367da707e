use regex::Regex;
use std::sync::LazyLock;

use super::RuleInput;
use crate::model::{RiskFinding, RuleKind, Severity};

/// Idioms javascript-obfuscator leaves behind in its output.
const MARKERS: &[&str] = &["while(!![])", "+-parseInt("];

static HEX_IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_0x[0-9a-fA-F]{6}").unwrap());

fn is_obfuscated(text: &str) -> bool {
    MARKERS.iter().any(|marker| text.contains(marker)) || HEX_IDENTIFIER.is_match(text)
}

pub(super) fn check(input: &RuleInput<'_>) -> Option<RiskFinding> {
    let hits: Vec<String> = input
        .files
        .iter()
        .filter(|file| is_obfuscated(&file.text))
        .map(|file| format!("- {} is obfuscated", file.path))
        .collect();

    if hits.is_empty() {
        return None;
    }

    Some(RiskFinding::new(
        RuleKind::Obfuscation,
        Severity::Medium,
        "code appears to be obfuscated",
        hits.join("\n"),
    ))
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::analyzer::SourceFile;

    #[test]
    fn test_hex_identifier_fires() {
        let mut inputs = Inputs::new();
        inputs.files = vec![
            SourceFile::new("package/clean.js", "module.exports = 1;"),
            SourceFile::new("package/min.js", "const id = 0x41a2c3; var _0xAB12CD = 1;"),
        ];

        let finding = check(&inputs.input("1.0.0")).unwrap();
        assert_eq!(finding.severity, Severity::Medium);
        assert_eq!(finding.evidence, "- package/min.js is obfuscated");
    }

    #[test]
    fn test_markers() {
        assert!(is_obfuscated("while(!![]){try{}catch(e){}}"));
        assert!(is_obfuscated("var a=-parseInt(b)/1+-parseInt(c)/2;"));
        assert!(!is_obfuscated("const _0x1 = 2; while (true) {}"));
    }

    #[test]
    fn test_clean_files_never_fire() {
        let mut inputs = Inputs::new();
        inputs.files = vec![SourceFile::new("package/index.js", "export const hex = 0xABCDEF;")];
        assert!(check(&inputs.input("1.0.0")).is_none());
    }
}
