use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::NewsItem;

/// Response from GET /posts/
#[derive(Debug, Clone, Deserialize)]
pub struct PostsResponse {
    #[serde(default)]
    pub results: Vec<Post>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub title: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<String>,
    pub source: Option<PostSource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostSource {
    pub title: Option<String>,
    pub url: Option<String>,
}

impl Post {
    pub fn into_item(self, now: DateTime<Utc>) -> NewsItem {
        let pub_date = self
            .published_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(now);
        let link = self
            .url
            .filter(|u| !u.is_empty())
            .or_else(|| self.source.as_ref().and_then(|s| s.url.clone()))
            .unwrap_or_default();
        let source = self
            .source
            .and_then(|s| s.title)
            .unwrap_or_else(|| "CryptoPanic".to_string());

        NewsItem {
            title: self.title.unwrap_or_default(),
            link,
            pub_date,
            source,
        }
    }
}
