//! Insight feed and dashboard summary.

use std::borrow::Borrow;

use datasynergy_core::models::{DashboardSummary, DataSource, Insight, SourceStatus};

/// Insights shown on the dashboard.
pub const DASHBOARD_INSIGHTS: usize = 3;

/// Sorts newest first; ties keep their original order.
pub fn sort_feed(insights: &mut [Insight]) {
    insights.sort_by(|a, b| b.date.cmp(&a.date));
}

/// Headline numbers over `sources`, with the latest insights attached.
///
/// A source counts as active while `connected` or `syncing`. The average
/// covers only sources that carry a quality score.
pub fn dashboard_summary<S>(sources: &[S], insights: &[Insight]) -> DashboardSummary
where
    S: Borrow<DataSource>,
{
    let sources: Vec<&DataSource> = sources.iter().map(Borrow::borrow).collect();

    let total_records = sources.iter().filter_map(|s| s.record_count).sum();
    let active_sources = sources
        .iter()
        .filter(|s| matches!(s.status, SourceStatus::Connected | SourceStatus::Syncing))
        .count();

    let scores: Vec<f64> = sources
        .iter()
        .filter_map(|s| s.quality_score)
        .map(f64::from)
        .collect();
    let average_quality = (!scores.is_empty())
        .then(|| (scores.iter().sum::<f64>() / scores.len() as f64 * 10.0).round() / 10.0);

    let last_sync = sources.iter().filter_map(|s| s.last_sync).max();

    let mut latest = insights.to_vec();
    sort_feed(&mut latest);
    latest.truncate(DASHBOARD_INSIGHTS);

    DashboardSummary {
        total_records,
        active_sources,
        total_sources: sources.len(),
        average_quality,
        last_sync,
        insights: latest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::{demo_insights, demo_sources};

    #[test]
    fn test_demo_dashboard() {
        let summary = dashboard_summary(&demo_sources(), &demo_insights());
        assert_eq!(summary.total_records, 14_535_000);
        assert_eq!(summary.total_sources, 5);
        // mysql + csv connected, postgres syncing
        assert_eq!(summary.active_sources, 3);
        assert_eq!(summary.average_quality, Some(78.6));
        assert_eq!(
            summary.last_sync.map(|t| t.to_rfc3339()),
            Some("2024-01-23T08:30:00+00:00".to_string())
        );
        let titles: Vec<&str> = summary.insights.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Revenue Growth Trend",
                "Customer Retention Improvement",
                "Product Feature Adoption"
            ]
        );
    }

    #[test]
    fn test_empty_registry() {
        let summary = dashboard_summary::<DataSource>(&[], &[]);
        assert_eq!(summary.total_records, 0);
        assert_eq!(summary.average_quality, None);
        assert!(summary.last_sync.is_none());
        assert!(summary.insights.is_empty());
    }

    #[test]
    fn test_feed_sorted_newest_first() {
        let mut feed = demo_insights();
        feed.reverse();
        sort_feed(&mut feed);
        assert_eq!(feed[0].id, "1");
        assert_eq!(feed[4].id, "5");
    }
}
