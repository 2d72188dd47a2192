//! News models shared by every provider adapter

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::window::TimeWindow;

/// The normalized shape every news adapter produces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    #[serde(rename = "pubDate")]
    pub pub_date: DateTime<Utc>,
    pub source: String,
}

/// An RSS feed and the source name its items are tagged with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub url: String,
    pub source: String,
}

impl Feed {
    pub fn new(url: &str, source: &str) -> Self {
        Self {
            url: url.to_string(),
            source: source.to_string(),
        }
    }

    pub fn defaults() -> Vec<Feed> {
        vec![
            Feed::new("https://www.coindesk.com/arc/outboundfeeds/rss/", "CoinDesk"),
            Feed::new("https://cointelegraph.com/rss", "CoinTelegraph"),
        ]
    }
}

/// Parameters of one news fetch
#[derive(Debug, Clone)]
pub struct NewsQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Age limit used when no explicit window is given
    pub since_hours: Option<f64>,
    pub per_feed: usize,
    pub coin: Option<String>,
}

impl Default for NewsQuery {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            since_hours: None,
            per_feed: 10,
            coin: None,
        }
    }
}

impl NewsQuery {
    pub fn for_window(window: &TimeWindow, per_feed: usize, coin: Option<&str>) -> Self {
        Self {
            from: Some(window.from),
            to: Some(window.to),
            since_hours: None,
            per_feed,
            coin: coin.map(|c| c.to_string()),
        }
    }

    /// Window filter: `[from, to]` when both bounds are set, otherwise an age limit
    pub fn admits(&self, item: &NewsItem, now: DateTime<Utc>, default_since_hours: f64) -> bool {
        match (self.from, self.to) {
            (Some(from), Some(to)) => item.pub_date >= from && item.pub_date <= to,
            _ => {
                let age_hours = (now - item.pub_date).num_milliseconds() as f64 / 3_600_000.0;
                age_hours <= self.since_hours.unwrap_or(default_since_hours)
            }
        }
    }
}

/// Result of one news fetch
#[derive(Debug, Clone, Default)]
pub struct NewsBatch {
    /// Newest first
    pub items: Vec<NewsItem>,
    /// Sources dropped entirely because their fetch failed
    pub skipped_sources: Vec<String>,
}

/// Newest first
pub fn sort_newest_first(items: &mut [NewsItem]) {
    items.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
}
