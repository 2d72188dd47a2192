use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;

use super::models::StreamContents;
use crate::api::fetcher::{ApiError, ResilientFetcher};
use crate::api::provider::{PageScope, PageSource, RawPage};

/// Feedly streams API, paginated by continuation token
pub struct FeedlyClient {
    fetcher: ResilientFetcher,
    token: String,
    base_url: String,
}

impl FeedlyClient {
    const DEFAULT_BASE_URL: &'static str = "https://cloud.feedly.com/v3";

    pub fn new(fetcher: ResilientFetcher, token: String) -> Self {
        Self {
            fetcher,
            token,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        }
    }

    fn create_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        let auth_value = HeaderValue::from_str(&format!("OAuth {}", self.token))
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to create auth header: {}", e)))?;
        headers.insert(AUTHORIZATION, auth_value);
        Ok(headers)
    }
}

#[async_trait]
impl PageSource<Option<String>> for FeedlyClient {
    /// GET /streams/contents?streamId=feed/<url>
    async fn fetch_page(&self, scope: &PageScope, continuation: &Option<String>) -> Result<RawPage, ApiError> {
        if self.token.is_empty() {
            return Err(ApiError::InvalidRequest("Feedly token not configured".to_string()));
        }
        let feed = scope
            .feed
            .as_ref()
            .ok_or_else(|| ApiError::InvalidRequest("Feedly stream needs a feed".to_string()))?;

        let mut params = vec![
            ("streamId", format!("feed/{}", feed.url)),
            ("count", scope.per_page.to_string()),
        ];
        if let Some(token) = continuation {
            params.push(("continuation", token.clone()));
        }
        let url = Url::parse_with_params(&format!("{}/streams/contents", self.base_url), &params)
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        let stream: StreamContents = self.fetcher.fetch_json(url.as_str(), &self.create_headers()?).await?;

        let now = Utc::now();
        Ok(RawPage {
            items: stream
                .items
                .into_iter()
                .map(|e| e.into_item(Some(&feed.source), now))
                .collect(),
            continuation: stream.continuation.filter(|c| !c.is_empty()),
        })
    }
}
