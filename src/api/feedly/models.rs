use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::NewsItem;

/// Response from GET /streams/contents
#[derive(Debug, Clone, Deserialize)]
pub struct StreamContents {
    #[serde(default)]
    pub items: Vec<Entry>,
    pub continuation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub title: Option<String>,
    /// Milliseconds since epoch
    pub published: Option<i64>,
    #[serde(default)]
    pub alternate: Vec<Link>,
    pub canonical_url: Option<String>,
    pub origin: Option<Origin>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Origin {
    pub title: Option<String>,
}

impl Entry {
    /// `feed_source` wins over the entry's own origin title
    pub fn into_item(self, feed_source: Option<&str>, now: DateTime<Utc>) -> NewsItem {
        let pub_date = self
            .published
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or(now);
        let link = self
            .canonical_url
            .or_else(|| self.alternate.into_iter().next().and_then(|l| l.href))
            .unwrap_or_default();
        let source = feed_source
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| self.origin.and_then(|o| o.title))
            .unwrap_or_else(|| "Feedly".to_string());

        NewsItem {
            title: self.title.unwrap_or_default(),
            link,
            pub_date,
            source,
        }
    }
}
