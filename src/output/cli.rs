use crate::checker::classify_global;
use crate::model::{GlobalUsage, ScanResult, ScannedDependency, Severity};
use anyhow::Result;
use std::fmt::Write;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct DependencyRow {
    #[tabled(rename = "Package")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Latest")]
    latest: String,
    #[tabled(rename = "Downloads")]
    downloads: String,
    #[tabled(rename = "Findings")]
    findings: usize,
    #[tabled(rename = "Highest")]
    highest: String,
}

#[derive(Tabled)]
struct FailureRow {
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Step")]
    step: String,
    #[tabled(rename = "Error")]
    message: String,
}

#[derive(Tabled)]
struct UsageRow {
    #[tabled(rename = "Global")]
    name: String,
    #[tabled(rename = "Access")]
    access: String,
    #[tabled(rename = "Category")]
    category: String,
}

pub fn print_cli_table(result: &ScanResult) -> Result<()> {
    print!("{}", render_table(result, true));
    Ok(())
}

/// Summary table ranked by finding count, then the findings of every
/// dependency that has any.
pub fn render_table(result: &ScanResult, color: bool) -> String {
    let mut out = String::new();
    out.push('\n');

    let ranked = result.ranked();
    if ranked.is_empty() {
        out.push_str("No new dependencies scanned.\n");
    } else {
        let _ = writeln!(out, "Scanned {} new dependencies:\n", ranked.len());

        let rows: Vec<DependencyRow> = ranked
            .iter()
            .map(|d| DependencyRow {
                name: truncate(&d.name, 40),
                version: d.version.clone(),
                latest: d.metadata.latest().unwrap_or("-").to_string(),
                downloads: d.downloads.downloads.to_string(),
                findings: d.findings.len(),
                highest: d
                    .highest_severity()
                    .map(|s| format_severity(s, color))
                    .unwrap_or_else(|| "-".to_string()),
            })
            .collect();

        let _ = writeln!(out, "{}", Table::new(rows).with(Style::rounded()));
    }

    for dependency in ranked.iter().filter(|d| !d.findings.is_empty()) {
        render_findings(&mut out, dependency, color);
    }

    if !result.failures.is_empty() {
        let _ = writeln!(out, "\n{} targets could not be scanned:\n", result.failures.len());
        let rows: Vec<FailureRow> = result
            .failures
            .iter()
            .map(|f| FailureRow {
                target: f.target.clone(),
                step: f.step.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
                message: truncate(&f.message, 60),
            })
            .collect();
        let _ = writeln!(out, "{}", Table::new(rows).with(Style::rounded()));
    }

    out.push('\n');
    render_summary(&mut out, result);
    out
}

fn render_findings(out: &mut String, dependency: &ScannedDependency, color: bool) {
    let _ = writeln!(out, "\n{}@{}:", dependency.name, dependency.version);
    for finding in &dependency.findings {
        let _ = writeln!(
            out,
            "  [{}] {}: {}",
            format_severity(finding.severity, color),
            finding.rule,
            finding.description
        );
        for line in finding.evidence.lines() {
            let _ = writeln!(out, "      {}", line);
        }
    }
    if !dependency.skipped_files.is_empty() {
        let _ = writeln!(out, "  ({} files could not be parsed)", dependency.skipped_files.len());
    }
}

fn render_summary(out: &mut String, result: &ScanResult) {
    out.push_str("Summary:\n");
    let _ = writeln!(out, "  Dependencies: {}", result.dependencies.len());
    if result.total_findings() > 0 {
        let _ = writeln!(
            out,
            "  Findings: {} high, {} medium, {} low",
            result.count_severity(Severity::High),
            result.count_severity(Severity::Medium),
            result.count_severity(Severity::Low)
        );
    } else {
        out.push_str("  Findings: none\n");
    }
    if !result.failures.is_empty() {
        let _ = writeln!(out, "  Failures: {}", result.failures.len());
    }
}

/// Usage map from `prscan analyze`, dangerous globals flagged with their category.
pub fn render_usage_table(usage: &GlobalUsage) -> String {
    if usage.is_empty() {
        return "No global usage found.\n".to_string();
    }

    let rows: Vec<UsageRow> = usage
        .iter()
        .map(|(name, access)| UsageRow {
            name: name.clone(),
            access: access.to_string(),
            category: classify_global(name, *access)
                .map(|c| c.as_str().to_string())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    format!("{}\n", Table::new(rows).with(Style::rounded()))
}

fn format_severity(severity: Severity, color: bool) -> String {
    if !color {
        return severity.as_str().to_uppercase();
    }
    match severity {
        Severity::High => "\x1b[91mHIGH\x1b[0m".to_string(),
        Severity::Medium => "\x1b[33mMEDIUM\x1b[0m".to_string(),
        Severity::Low => "\x1b[32mLOW\x1b[0m".to_string(),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
