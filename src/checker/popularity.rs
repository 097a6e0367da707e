use super::RuleInput;
use crate::model::{RiskFinding, RuleKind, Severity};

pub(super) fn check(input: &RuleInput<'_>, threshold: u64) -> Option<RiskFinding> {
    let stats = input.downloads;
    if stats.downloads >= threshold {
        return None;
    }

    Some(RiskFinding::new(
        RuleKind::Popularity,
        Severity::Medium,
        "uses a rarely downloaded package",
        format!(
            "{} was downloaded only {} times between {} and {}",
            input.name, stats.downloads, stats.start, stats.end
        ),
    ))
}
