use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::models::NewsItem;

/// Response from GET /data/v2/news/
///
/// On errors the API replies with `Data` as an object, which fails to decode
/// and is treated as a malformed page.
#[derive(Debug, Clone, Deserialize)]
pub struct NewsResponse {
    #[serde(rename = "Data", default)]
    pub data: Vec<Article>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Article {
    pub title: Option<String>,
    pub url: Option<String>,
    pub guid: Option<String>,
    pub source: Option<String>,
    /// Seconds since epoch
    pub published_on: Option<i64>,
}

impl Article {
    pub fn into_item(self, now: DateTime<Utc>) -> NewsItem {
        let pub_date = self
            .published_on
            .filter(|s| *s > 0)
            .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
            .unwrap_or_else(|| {
                debug!("Article {:?} has no usable published_on ({:?}), stamping now", self.title, self.published_on);
                now
            });

        NewsItem {
            title: self.title.unwrap_or_default(),
            link: self.url.or(self.guid).unwrap_or_default(),
            pub_date,
            source: self.source.unwrap_or_else(|| "CryptoCompare".to_string()),
        }
    }
}

/// Map display feed names to CryptoCompare feed keys
pub fn feed_key(source: &str) -> String {
    let lower = source.to_lowercase();
    if lower.contains("coindesk") {
        "coindesk".to_string()
    } else if lower.contains("cointelegraph") {
        "cointelegraph".to_string()
    } else {
        lower
    }
}
