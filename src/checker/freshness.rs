use chrono::Duration;
use semver::Version;

use super::RuleInput;
use crate::model::{RiskFinding, RuleKind, Severity};

/// Fires when the scanned version is the `latest` tag and that version was
/// published within the last `days` days.
pub(super) fn check(input: &RuleInput<'_>, days: u32) -> Option<RiskFinding> {
    let latest = input.metadata.latest()?;
    if !same_version(input.version, latest) {
        return None;
    }

    let published = input.metadata.published_at(latest)?;
    if input.now - published >= Duration::days(i64::from(days)) {
        return None;
    }

    Some(RiskFinding::new(
        RuleKind::Freshness,
        Severity::Low,
        "uses the latest or a recently published version",
        format!(
            "{} uses the latest version {}, published within the last {} days",
            input.name, input.version, days
        ),
    ))
}

fn same_version(a: &str, b: &str) -> bool {
    match (Version::parse(a), Version::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
