//! Demo data preloaded when `simulation.seed_demo_data = true`.

use chrono::{DateTime, TimeZone, Utc};
use datasynergy_core::models::{
    Column, ConnectionCredentials, DataSource, DataSourceKind, Insight, Schema, SourceCitation,
    SourceStatus, Table,
};

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).single()
}

fn table(name: &str, row_count: u64, columns: Vec<Column>) -> Table {
    Table {
        name: name.to_string(),
        row_count,
        columns,
    }
}

fn cite(name: &str, confidence: u8) -> SourceCitation {
    SourceCitation {
        name: name.to_string(),
        confidence,
    }
}

fn demo_source(id: &str, name: &str, kind: DataSourceKind, status: SourceStatus) -> DataSource {
    DataSource {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        status,
        credentials: None,
        last_sync: None,
        record_count: None,
        quality_score: None,
        message: None,
        icon: Some(kind.default_icon().to_string()),
        schemas: None,
    }
}

/// The five demo sources, ids `"1"` to `"5"`.
pub fn demo_sources() -> Vec<DataSource> {
    let mysql = DataSource {
        credentials: Some(ConnectionCredentials::relational(
            "localhost",
            3306,
            "mydatabase",
            "user",
            "password",
        )),
        last_sync: at(2024, 1, 22, 10, 0),
        record_count: Some(1_500_000),
        quality_score: Some(78),
        schemas: Some(vec![Schema {
            name: "default".to_string(),
            tables: vec![
                table(
                    "users",
                    50_000,
                    vec![
                        Column::new("id", "int").primary(),
                        Column::new("name", "varchar"),
                        Column::new("email", "varchar"),
                        Column::new("created_at", "timestamp").nullable(),
                    ],
                ),
                table(
                    "orders",
                    100_000,
                    vec![
                        Column::new("id", "int").primary(),
                        Column::new("user_id", "int").foreign(),
                        Column::new("product_id", "int").foreign(),
                        Column::new("order_date", "timestamp"),
                        Column::new("total_amount", "decimal"),
                    ],
                ),
            ],
        }]),
        ..demo_source("1", "MySQL Database", DataSourceKind::Mysql, SourceStatus::Connected)
    };

    let postgres = DataSource {
        credentials: Some(ConnectionCredentials::relational(
            "localhost",
            5432,
            "warehouse",
            "admin",
            "password",
        )),
        last_sync: at(2024, 1, 23, 8, 30),
        record_count: Some(5_000_000),
        quality_score: Some(92),
        schemas: Some(vec![Schema {
            name: "public".to_string(),
            tables: vec![
                table(
                    "customers",
                    200_000,
                    vec![
                        Column::new("customer_id", "int").primary(),
                        Column::new("first_name", "varchar"),
                        Column::new("last_name", "varchar"),
                        Column::new("email", "varchar"),
                        Column::new("signup_date", "timestamp"),
                    ],
                ),
                table(
                    "products",
                    50_000,
                    vec![
                        Column::new("product_id", "int").primary(),
                        Column::new("product_name", "varchar"),
                        Column::new("description", "text").nullable(),
                        Column::new("price", "decimal"),
                    ],
                ),
                table(
                    "sales",
                    1_000_000,
                    vec![
                        Column::new("sale_id", "int").primary(),
                        Column::new("customer_id", "int").foreign(),
                        Column::new("product_id", "int").foreign(),
                        Column::new("sale_date", "timestamp"),
                        Column::new("quantity", "int"),
                    ],
                ),
            ],
        }]),
        ..demo_source(
            "2",
            "PostgreSQL Warehouse",
            DataSourceKind::Postgresql,
            SourceStatus::Syncing,
        )
    };

    let mongo = DataSource {
        credentials: Some(ConnectionCredentials::relational(
            "localhost",
            27017,
            "analytics",
            "analyst",
            "password",
        )),
        last_sync: at(2024, 1, 20, 15, 45),
        record_count: Some(8_000_000),
        quality_score: Some(65),
        message: Some("Connection refused".to_string()),
        ..demo_source("3", "MongoDB Analytics", DataSourceKind::Mongodb, SourceStatus::Error)
    };

    let csv = DataSource {
        last_sync: at(2024, 1, 21, 12, 0),
        record_count: Some(25_000),
        quality_score: Some(88),
        ..demo_source("4", "CSV Sales Data", DataSourceKind::Csv, SourceStatus::Connected)
    };

    let api = DataSource {
        last_sync: at(2024, 1, 19, 9, 0),
        record_count: Some(10_000),
        quality_score: Some(70),
        message: Some("Under maintenance".to_string()),
        ..demo_source(
            "5",
            "REST API - Marketing",
            DataSourceKind::Api,
            SourceStatus::Maintenance,
        )
    };

    vec![mysql, postgres, mongo, csv, api]
}

/// The demo insight feed, newest first.
pub fn demo_insights() -> Vec<Insight> {
    let insight = |id: &str, title: &str, content: &str, category: &str, date, sources| Insight {
        id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        category: category.to_string(),
        date,
        sources,
    };

    [
        (
            "1",
            "Revenue Growth Trend",
            "Revenue has shown a consistent growth of 15% month-over-month for the past quarter, significantly outperforming industry standards.",
            "Sales",
            at(2024, 1, 15, 9, 15),
            vec![cite("Financial Database", 95), cite("Market Analysis", 85)],
        ),
        (
            "2",
            "Customer Retention Improvement",
            "Customer retention rate increased from 65% to 78% after the implementation of the new loyalty program.",
            "Customer",
            at(2024, 1, 12, 14, 30),
            vec![cite("CRM Data", 92), cite("Customer Surveys", 75)],
        ),
        (
            "3",
            "Product Feature Adoption",
            "The new collaboration feature has a 45% adoption rate, with users spending an average of 25 minutes using it daily.",
            "Product",
            at(2024, 1, 10, 11, 45),
            vec![cite("Usage Analytics", 97), cite("User Feedback", 80)],
        ),
        (
            "4",
            "Marketing Campaign Effectiveness",
            "The Q4 email campaign achieved a 28% open rate and 12% conversion rate, generating $450,000 in attributable revenue.",
            "Marketing",
            at(2024, 1, 8, 16, 20),
            vec![cite("Marketing Analytics", 93), cite("Sales Data", 88)],
        ),
        (
            "5",
            "Support Ticket Resolution Time",
            "Average support ticket resolution time decreased by 35% after implementing the new knowledge base and chatbot integration.",
            "Customer Success",
            at(2024, 1, 5, 13, 10),
            vec![cite("Support Desk", 96), cite("Customer Feedback", 82)],
        ),
    ]
    .into_iter()
    .filter_map(|(id, title, content, category, date, sources)| {
        Some(insight(id, title, content, category, date?, sources))
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_sources_are_valid() {
        let sources = demo_sources();
        let ids: Vec<&str> = sources.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
        for source in &sources {
            for schema in source.schemas.iter().flatten() {
                schema.validate().unwrap();
            }
        }
        assert_eq!(sources[2].message.as_deref(), Some("Connection refused"));
        assert_eq!(sources[3].icon.as_deref(), Some("FileText"));
        assert_eq!(sources[4].icon.as_deref(), Some("TrendingUp"));
    }

    #[test]
    fn test_demo_insights_newest_first() {
        let insights = demo_insights();
        assert_eq!(insights.len(), 5);
        assert!(insights.windows(2).all(|w| w[0].date >= w[1].date));
    }
}
