//! Advisory query optimizer.
//!
//! A pure text rewrite: nothing is parsed beyond a handful of keyword
//! patterns and nothing is executed. Two rewrites exist:
//!
//! 1. `SELECT *` becomes an explicit column list, taken from the source's
//!    recorded schema when the referenced table is known.
//! 2. A query without a `LIMIT` gets `LIMIT 1000` appended.
//!
//! Running the optimizer on its own output returns the input unchanged.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};

use crate::models::{DataSource, OptimizedQuery, SourceFamily};

/// Row cap appended to unbounded queries.
pub const DEFAULT_ROW_LIMIT: u32 = 1000;

/// Column list used when the referenced table is not in the schema.
pub const FALLBACK_COLUMNS: &str = "id, name, created_at";

static SELECT_STMT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*select\b").expect("valid regex"));
static SELECT_STAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bselect\s+\*").expect("valid regex"));
static LIMIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blimit\b").expect("valid regex"));
static FROM_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfrom\s+([A-Za-z_][\w.]*)").expect("valid regex"));

/// Name of the first table in a `FROM` clause, if any.
pub fn referenced_table(query: &str) -> Option<&str> {
    FROM_TABLE
        .captures(query)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Whether the query already carries a `LIMIT` keyword outside `--` comments.
pub fn has_limit(query: &str) -> bool {
    query
        .lines()
        .any(|line| LIMIT.is_match(line.split("--").next().unwrap_or_default()))
}

/// Splits a trailing `--` comment on the last line off the query text.
fn split_trailing_comment(query: &str) -> (&str, &str) {
    let body = query.trim_end();
    let line_start = body.rfind('\n').map_or(0, |i| i + 1);
    match body[line_start..].find("--") {
        Some(pos) => body.split_at(line_start + pos),
        None => (body, ""),
    }
}

fn unchanged(query: &str) -> OptimizedQuery {
    OptimizedQuery {
        success: true,
        optimized_query: query.to_string(),
        improvement_notes: None,
    }
}

fn explicit_columns(query: &str, source: Option<&DataSource>) -> String {
    referenced_table(query)
        .and_then(|table| source.and_then(|s| s.find_table(table)))
        .filter(|t| !t.columns.is_empty())
        .map(|t| {
            t.columns
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_else(|| FALLBACK_COLUMNS.to_string())
}

fn append_limit(query: &str) -> String {
    let (code, comment) = split_trailing_comment(query);
    let body = code.trim_end();
    let stripped = body.trim_end_matches(';').trim_end();
    let terminator = if stripped.len() < body.len() { ";" } else { "" };
    if comment.is_empty() {
        return format!("{} LIMIT {}{}", stripped, DEFAULT_ROW_LIMIT, terminator);
    }
    let gap = match &code[body.len()..] {
        "" => " ",
        gap => gap,
    };
    format!("{} LIMIT {}{}{}{}", stripped, DEFAULT_ROW_LIMIT, terminator, gap, comment)
}

/// Rewrites `query` for the given source (or a generic SQL source when
/// `source` is `None`). Never fails; absence of improvement is a normal
/// outcome with `improvement_notes` left empty.
pub fn optimize_query(query: &str, source: Option<&DataSource>) -> OptimizedQuery {
    if query.trim().is_empty() || !SELECT_STMT.is_match(query) {
        return unchanged(query);
    }
    if source.is_some_and(|s| s.kind.family() == SourceFamily::Document) {
        return unchanged(query);
    }

    let mut optimized = query.to_string();
    let mut notes = Vec::new();

    if SELECT_STAR.is_match(&optimized) {
        let columns = explicit_columns(&optimized, source);
        let replacement = format!("SELECT {}", columns);
        optimized = SELECT_STAR
            .replace(&optimized, NoExpand(&replacement))
            .into_owned();
        notes.push(format!(
            "Replaced SELECT * with an explicit column list ({}).",
            columns
        ));
    }

    if !has_limit(&optimized) {
        optimized = append_limit(&optimized);
        notes.push(format!(
            "Added LIMIT {} to bound the result set.",
            DEFAULT_ROW_LIMIT
        ));
    }

    if notes.is_empty() {
        return unchanged(query);
    }

    OptimizedQuery {
        success: true,
        optimized_query: optimized,
        improvement_notes: Some(notes.join(" ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Column, DataSourceKind, Schema, SourceStatus, Table};

    fn source_with_users(kind: DataSourceKind) -> DataSource {
        DataSource {
            id: "1".into(),
            name: "db".into(),
            kind,
            status: SourceStatus::Connected,
            credentials: None,
            last_sync: None,
            record_count: None,
            quality_score: None,
            message: None,
            icon: None,
            schemas: Some(vec![Schema {
                name: "default".into(),
                tables: vec![Table {
                    name: "users".into(),
                    row_count: 10,
                    columns: vec![
                        Column::new("id", "int").primary(),
                        Column::new("email", "varchar"),
                    ],
                }],
            }]),
        }
    }

    #[test]
    fn test_select_star_without_schema_uses_fallback_columns() {
        let out = optimize_query("SELECT * FROM orders", None);
        assert_eq!(
            out.optimized_query,
            "SELECT id, name, created_at FROM orders LIMIT 1000"
        );
        assert!(out.success);
        let notes = out.improvement_notes.unwrap();
        assert!(notes.contains("explicit column list"));
        assert!(notes.contains("LIMIT 1000"));
    }

    #[test]
    fn test_select_star_uses_schema_columns() {
        let source = source_with_users(DataSourceKind::Mysql);
        let out = optimize_query("select * from users;", Some(&source));
        assert_eq!(out.optimized_query, "SELECT id, email from users LIMIT 1000;");
    }

    #[test]
    fn test_already_optimized_is_unchanged_and_idempotent() {
        let q = "SELECT id, name FROM users LIMIT 10";
        let first = optimize_query(q, None);
        assert_eq!(first.optimized_query, q);
        assert!(first.improvement_notes.is_none());
        let second = optimize_query(&first.optimized_query, None);
        assert_eq!(second, first);
    }

    #[test]
    fn test_output_is_a_fixed_point() {
        let once = optimize_query("SELECT * FROM sales", None);
        let twice = optimize_query(&once.optimized_query, None);
        assert_eq!(twice.optimized_query, once.optimized_query);
        assert!(twice.improvement_notes.is_none());
    }

    #[test]
    fn test_limit_detection_is_word_bounded() {
        let out = optimize_query("SELECT rate_limited FROM events", None);
        assert_eq!(
            out.optimized_query,
            "SELECT rate_limited FROM events LIMIT 1000"
        );
    }

    #[test]
    fn test_limit_goes_before_trailing_line_comment() {
        let out = optimize_query("SELECT * FROM orders -- recent", None);
        assert_eq!(
            out.optimized_query,
            "SELECT id, name, created_at FROM orders LIMIT 1000 -- recent"
        );
        let again = optimize_query(&out.optimized_query, None);
        assert!(again.improvement_notes.is_none());

        let out = optimize_query("SELECT id FROM t; -- no limit here", None);
        assert_eq!(out.optimized_query, "SELECT id FROM t LIMIT 1000; -- no limit here");

        let out = optimize_query("SELECT id\nFROM t\n-- note", None);
        assert_eq!(out.optimized_query, "SELECT id\nFROM t LIMIT 1000\n-- note");
    }

    #[test]
    fn test_count_star_is_not_select_star() {
        let out = optimize_query("SELECT COUNT(*) FROM orders LIMIT 1", None);
        assert_eq!(out.optimized_query, "SELECT COUNT(*) FROM orders LIMIT 1");
        assert!(out.improvement_notes.is_none());
    }

    #[test]
    fn test_document_sources_and_non_select_untouched() {
        let mongo = source_with_users(DataSourceKind::Mongodb);
        let out = optimize_query("SELECT * FROM users", Some(&mongo));
        assert_eq!(out.optimized_query, "SELECT * FROM users");

        let out = optimize_query("db.customers.find().limit(10)", None);
        assert_eq!(out.optimized_query, "db.customers.find().limit(10)");

        let out = optimize_query("DELETE FROM users", None);
        assert!(out.improvement_notes.is_none());
    }

    #[test]
    fn test_empty_query_never_fails() {
        let out = optimize_query("   ", None);
        assert!(out.success);
        assert_eq!(out.optimized_query, "   ");
    }

    #[test]
    fn test_referenced_table() {
        assert_eq!(referenced_table("select a from public.sales s"), Some("public.sales"));
        assert_eq!(referenced_table("select 1"), None);
    }
}
