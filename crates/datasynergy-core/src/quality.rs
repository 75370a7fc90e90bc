//! Quality scoring over a source's recorded metadata.
//!
//! The analysis is a deterministic function of the [`DataSource`] record
//! and an `as_of` timestamp; it never re-scans the backing store. Callers
//! that want fresh input refresh the source first.
//!
//! Issues are reported in detection order:
//!
//! | # | check | severity |
//! |---|-------|----------|
//! | 1 | source status is `error` | high |
//! | 2 | primary key column flagged nullable | high |
//! | 3 | table without a primary key | medium |
//! | 4 | no records synced | medium |
//! | 5 | last sync older than [`STALE_AFTER_DAYS`] | medium |
//! | 6 | source under maintenance | low |
//! | 7 | relational source without recorded schema | low |
//! | 8 | SSL disabled on a networked source | low |

use chrono::{DateTime, Utc};

use crate::models::{DataSource, QualityIssue, QualityReport, Severity, SourceStatus};

pub const STALE_AFTER_DAYS: i64 = 7;

fn penalty(severity: Severity) -> u32 {
    match severity {
        Severity::High => 25,
        Severity::Medium => 10,
        Severity::Low => 5,
    }
}

fn issue(severity: Severity, issue: String, recommendation: &str) -> QualityIssue {
    QualityIssue {
        severity,
        issue,
        recommendation: recommendation.to_string(),
    }
}

/// Runs every check against `source`, in detection order.
pub fn detect_issues(source: &DataSource, as_of: DateTime<Utc>) -> Vec<QualityIssue> {
    let mut issues = Vec::new();
    let schemas = source.schemas.as_deref().unwrap_or_default();

    if source.status == SourceStatus::Error {
        issues.push(issue(
            Severity::High,
            format!(
                "Source reported an error: {}",
                source.message.as_deref().unwrap_or("unknown error")
            ),
            "Re-test the connection and refresh the source once it is reachable.",
        ));
    }

    for schema in schemas {
        for table in &schema.tables {
            for col in table.columns.iter().filter(|c| c.is_primary && c.is_nullable) {
                issues.push(issue(
                    Severity::High,
                    format!(
                        "Primary key column {}.{} is flagged nullable",
                        table.name, col.name
                    ),
                    "Add a NOT NULL constraint to the primary key column.",
                ));
            }
        }
    }

    for schema in schemas {
        for table in schema.tables.iter().filter(|t| t.primary_key().is_none()) {
            issues.push(issue(
                Severity::Medium,
                format!("Table {}.{} has no primary key", schema.name, table.name),
                "Add a primary key so rows can be uniquely identified and deduplicated.",
            ));
        }
    }

    if source.record_count.unwrap_or(0) == 0 {
        issues.push(issue(
            Severity::Medium,
            "No records have been synced yet".to_string(),
            "Refresh the source to pull records before relying on this report.",
        ));
    }

    if let Some(last_sync) = source.last_sync {
        let age = as_of.signed_duration_since(last_sync).num_days();
        if age > STALE_AFTER_DAYS {
            issues.push(issue(
                Severity::Medium,
                format!("Last successful sync was {} days ago", age),
                "Schedule regular refreshes to keep the data current.",
            ));
        }
    }

    if source.status == SourceStatus::Maintenance {
        issues.push(issue(
            Severity::Low,
            "Source is under maintenance; data may be incomplete".to_string(),
            "Re-run the analysis once maintenance is over.",
        ));
    }

    if source.kind.has_relational_schema() && schemas.is_empty() {
        issues.push(issue(
            Severity::Low,
            "No schema metadata recorded".to_string(),
            "Introspect the source to capture table and column metadata.",
        ));
    }

    let ssl_disabled = source
        .credentials
        .as_ref()
        .is_some_and(|c| c.use_ssl == Some(false));
    if source.kind.is_networked() && ssl_disabled {
        issues.push(issue(
            Severity::Low,
            "SSL is disabled for this connection".to_string(),
            "Enable SSL to encrypt traffic to the source.",
        ));
    }

    issues
}

/// Score derived from issue penalties alone.
pub fn derived_score(issues: &[QualityIssue]) -> u8 {
    let total: u32 = issues.iter().map(|i| penalty(i.severity)).sum();
    100u32.saturating_sub(total) as u8
}

fn summarize(score: u8, issues: &[QualityIssue]) -> String {
    let band = match score {
        90..=100 => "excellent",
        75..=89 => "good",
        50..=74 => "fair",
        _ => "poor",
    };
    if issues.is_empty() {
        return format!("Overall data quality is {} with no issues detected.", band);
    }
    let high = issues
        .iter()
        .filter(|i| i.severity == Severity::High)
        .count();
    format!(
        "Overall data quality is {} with {} issue{} detected ({} high severity).",
        band,
        issues.len(),
        if issues.len() == 1 { "" } else { "s" },
        high
    )
}

/// Quality report for `source` as of `as_of`.
///
/// The score is [`derived_score`] over the detected issues, capped by the
/// source's recorded quality score when one exists.
pub fn analyze_source(source: &DataSource, as_of: DateTime<Utc>) -> QualityReport {
    let issues = detect_issues(source, as_of);
    let derived = derived_score(&issues);
    let quality_score = source
        .quality_score
        .map_or(derived, |recorded| recorded.min(derived));
    QualityReport {
        summary: summarize(quality_score, &issues),
        quality_score,
        issues,
    }
}
