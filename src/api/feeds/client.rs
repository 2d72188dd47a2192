use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;

use crate::api::fetcher::{ApiError, ResilientFetcher};
use crate::api::provider::FeedSource;
use crate::models::{Feed, NewsItem};

/// Plain RSS feed reader
pub struct RssFeedClient {
    fetcher: ResilientFetcher,
}

impl RssFeedClient {
    pub fn new(fetcher: ResilientFetcher) -> Self {
        Self { fetcher }
    }
}

/// RFC 2822 (`pubDate`) first, then RFC 3339 (`dc:date`)
fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw.trim())
        .or_else(|_| DateTime::parse_from_rfc3339(raw.trim()))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Normalize a parsed channel; items without a usable date are stamped `now`
pub fn channel_to_items(channel: &rss::Channel, source: &str, now: DateTime<Utc>) -> Vec<NewsItem> {
    channel
        .items()
        .iter()
        .map(|item| {
            let link = item
                .link()
                .map(str::to_string)
                .or_else(|| item.guid().map(|g| g.value().to_string()))
                .unwrap_or_default();
            let pub_date = item
                .pub_date()
                .and_then(parse_feed_date)
                .or_else(|| {
                    item.dublin_core_ext()
                        .and_then(|dc| dc.dates().first())
                        .and_then(|d| parse_feed_date(d))
                })
                .unwrap_or(now);

            NewsItem {
                title: item.title().unwrap_or_default().to_string(),
                link,
                pub_date,
                source: source.to_string(),
            }
        })
        .collect()
}

#[async_trait]
impl FeedSource for RssFeedClient {
    async fn fetch_feed(&self, feed: &Feed) -> Result<Vec<NewsItem>, ApiError> {
        let body = self.fetcher.fetch_bytes(&feed.url, &HeaderMap::new()).await?;
        let channel = rss::Channel::read_from(&body[..])
            .map_err(|e| ApiError::DeserializationError(format!("Failed to parse feed {}: {}", feed.url, e)))?;
        Ok(channel_to_items(&channel, &feed.source, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Sample</title>
    <link>https://example.com</link>
    <description>sample</description>
    <item>
      <title>Bitcoin tops 70k</title>
      <link>https://example.com/a</link>
      <pubDate>Thu, 14 Mar 2024 09:30:00 +0000</pubDate>
    </item>
    <item>
      <title>Ether staking update</title>
      <guid>https://example.com/b</guid>
      <dc:date>2024-03-14T08:00:00Z</dc:date>
    </item>
    <item>
      <title>Undated</title>
      <link>https://example.com/c</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_channel_normalization() {
        let channel = rss::Channel::read_from(SAMPLE.as_bytes()).unwrap();
        let now = DateTime::parse_from_rfc3339("2024-03-15T00:00:00Z").unwrap().with_timezone(&Utc);
        let items = channel_to_items(&channel, "CoinDesk", now);

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].link, "https://example.com/a");
        assert_eq!(items[0].pub_date.to_rfc3339(), "2024-03-14T09:30:00+00:00");
        assert_eq!(items[1].link, "https://example.com/b");
        assert_eq!(items[1].pub_date.to_rfc3339(), "2024-03-14T08:00:00+00:00");
        assert_eq!(items[2].pub_date, now);
        assert!(items.iter().all(|i| i.source == "CoinDesk"));
    }
}
