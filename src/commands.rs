//! CLI command handlers.
//!
//! Each `run_*` function drives one [`DataService`] operation and prints
//! the result: aligned text tables for listings, pretty JSON for
//! structured documents. Façade errors propagate as `anyhow` errors so the
//! binary exits non-zero with the message.

use std::path::Path;

use anyhow::{bail, Context, Result};
use datasynergy_core::models::{
    ConnectionCredentials, DataSourceKind, NlResult, QueryResult, SourceDraft, SourceStatus,
};
use serde::Serialize;

use crate::nl::AnswerOrigin;
use crate::service::DataService;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

// ============ Sources ============

pub async fn run_sources(service: &DataService) -> Result<()> {
    let sources = service.list_sources().await?;
    println!(
        "{:<38} {:<24} {:<12} {:<13} {:>10} {:>7}",
        "ID", "NAME", "KIND", "STATUS", "RECORDS", "QUALITY"
    );
    for s in &sources {
        println!(
            "{:<38} {:<24} {:<12} {:<13} {:>10} {:>7}",
            s.id,
            s.name,
            s.kind,
            s.status,
            or_dash(s.record_count),
            or_dash(s.quality_score)
        );
    }
    println!("\n{} source(s)", sources.len());
    Ok(())
}

pub async fn run_get(service: &DataService, id: &str) -> Result<()> {
    let source = service.get_source(id).await?;
    print_json(&source.redacted())
}

pub async fn run_add(service: &DataService, draft: SourceDraft) -> Result<()> {
    let source = service.add_source(draft).await?;
    println!("Added {} source '{}'", source.kind, source.name);
    println!("  id: {}", source.id);
    Ok(())
}

pub async fn run_refresh(service: &DataService) -> Result<()> {
    let summary = service.refresh_all().await?;
    println!(
        "Refreshed {} source(s), {} failed, {} skipped",
        summary.refreshed, summary.failed, summary.skipped
    );
    for s in service.list_sources().await? {
        if s.status == SourceStatus::Error {
            println!("  {} ({}): {}", s.name, s.id, or_dash(s.message.as_deref()));
        }
    }
    Ok(())
}

pub async fn run_set_status(
    service: &DataService,
    id: &str,
    status: &str,
    message: Option<String>,
) -> Result<()> {
    let status: SourceStatus = status.parse()?;
    let source = service.set_status(id, status, message).await?;
    println!("{} is now {}", source.name, source.status);
    Ok(())
}

pub async fn run_reconnect(service: &DataService, id: &str) -> Result<()> {
    let result = service.reconnect(id).await?;
    if !result.success {
        bail!("reconnect failed: {}", result.message);
    }
    println!("{}", result.message);
    Ok(())
}

pub async fn run_test_connection(
    service: &DataService,
    kind: &str,
    credentials: ConnectionCredentials,
) -> Result<()> {
    let kind: DataSourceKind = kind.parse()?;
    let result = service.test_connection(&credentials, kind).await;
    if !result.success {
        bail!("{}", result.message);
    }
    println!("{}", result.message);
    Ok(())
}

// ============ Schemas ============

pub async fn run_schemas(service: &DataService, id: &str) -> Result<()> {
    let schemas = service.get_schemas(id).await?;
    if schemas.is_empty() {
        println!("No schema metadata recorded for {}", id);
        return Ok(());
    }
    for schema in &schemas {
        println!("{}", schema.name);
        for table in &schema.tables {
            println!("  {} ({} rows)", table.name, table.row_count);
            for col in &table.columns {
                let mut flags = Vec::new();
                if col.is_primary {
                    flags.push("PK");
                }
                if col.is_foreign {
                    flags.push("FK");
                }
                if col.is_nullable {
                    flags.push("NULL");
                }
                println!("    {:<20} {:<12} {}", col.name, col.type_name, flags.join(" "));
            }
        }
    }
    Ok(())
}

pub async fn run_export_schema(
    service: &DataService,
    id: &str,
    output: Option<&Path>,
) -> Result<()> {
    let export = service.export_schema(id).await?;
    let text = serde_json::to_string_pretty(&export.data)?;
    match output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Schema written to {}", path.display());
        }
        None => println!("{}", text),
    }
    if let Some(message) = &export.message {
        eprintln!("{}", message);
    }
    Ok(())
}

// ============ Queries ============

fn print_table(result: &QueryResult) {
    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect();
    let widths: Vec<usize> = result
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .map(|r| r[i].len())
                .chain(std::iter::once(name.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: &[String]| {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = w))
            .collect::<Vec<_>>()
            .join("  ")
    };
    println!("{}", line(&result.columns));
    for row in &cells {
        println!("{}", line(row));
    }
}

pub async fn run_query(service: &DataService, id: &str, query: &str, json: bool) -> Result<()> {
    let result = service.execute_query(id, query).await?;
    if json {
        return print_json(&result);
    }
    print_table(&result);
    println!("\n{} row(s) in {:.3}s", result.row_count, result.query_time);
    Ok(())
}

pub async fn run_optimize(service: &DataService, query: &str, source: Option<&str>) -> Result<()> {
    let optimized = service.optimize_query(query, source).await;
    println!("{}", optimized.optimized_query);
    if let Some(notes) = &optimized.improvement_notes {
        println!("\n{}", notes);
    }
    Ok(())
}

pub fn run_samples(service: &DataService, kind: &str) -> Result<()> {
    let kind: DataSourceKind = kind.parse()?;
    let samples = service.sample_queries(kind);
    if samples.is_empty() {
        println!("No sample queries for {}", kind);
    }
    for q in samples {
        println!("{}", q);
    }
    Ok(())
}

pub async fn run_quality(service: &DataService, id: &str) -> Result<()> {
    let report = service.analyze_quality(id).await?;
    println!("Quality score: {}/100", report.quality_score);
    println!("{}", report.summary);
    for issue in &report.issues {
        println!("\n[{}] {}", issue.severity.as_str(), issue.issue);
        println!("  -> {}", issue.recommendation);
    }
    Ok(())
}

// ============ Natural language ============

pub async fn run_ask(service: &DataService, query: &str, json: bool) -> Result<()> {
    let answer = service.ask(query).await?;
    if json {
        return print_json(&answer.result.raw_json());
    }

    println!("{}", answer.result.natural_language());
    if let NlResult::Structured(s) = &answer.result {
        if !s.insights.is_empty() {
            println!("\nInsights:");
            for i in &s.insights {
                println!("  - {}", i);
            }
        }
        if !s.recommendations.is_empty() {
            println!("\nRecommendations:");
            for r in &s.recommendations {
                println!("  - {}", r);
            }
        }
        if !s.sources.is_empty() {
            println!("\nSources:");
            for c in &s.sources {
                println!("  {} ({}%)", c.name, c.confidence);
            }
        }
    }
    if answer.origin == AnswerOrigin::LocalResponder && service.has_ai_backend() {
        eprintln!("(answered by the local responder)");
    }
    Ok(())
}

// ============ Insights ============

pub fn run_insights(service: &DataService) -> Result<()> {
    for insight in service.insights() {
        println!(
            "{}  [{}] {}",
            insight.date.format("%Y-%m-%d"),
            insight.category,
            insight.title
        );
        println!("  {}", insight.content);
    }
    Ok(())
}

pub async fn run_dashboard(service: &DataService) -> Result<()> {
    let summary = service.dashboard().await?;
    println!("{:<16} {}", "Total records", summary.total_records);
    println!(
        "{:<16} {}/{}",
        "Active sources", summary.active_sources, summary.total_sources
    );
    println!(
        "{:<16} {}",
        "Avg quality",
        or_dash(summary.average_quality.map(|q| format!("{:.1}", q)))
    );
    println!(
        "{:<16} {}",
        "Last sync",
        or_dash(summary.last_sync.map(|t| t.to_rfc3339()))
    );
    if !summary.insights.is_empty() {
        println!("\nLatest insights:");
        for i in &summary.insights {
            println!("  {}  {}", i.date.format("%Y-%m-%d"), i.title);
        }
    }
    Ok(())
}
