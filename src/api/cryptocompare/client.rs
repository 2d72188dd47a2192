use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Url;

use super::models::NewsResponse;
use crate::api::fetcher::{ApiError, ResilientFetcher};
use crate::api::provider::{PageScope, PageSource, RawPage};

/// CryptoCompare latest-news API, paginated by an `lTs` timestamp cursor
pub struct CryptoCompareClient {
    fetcher: ResilientFetcher,
    api_key: String,
    /// CryptoCompare feed keys, e.g. `coindesk`
    feeds: Vec<String>,
    base_url: String,
}

impl CryptoCompareClient {
    const DEFAULT_BASE_URL: &'static str = "https://min-api.cryptocompare.com/data/v2/news/";

    pub fn new(fetcher: ResilientFetcher, api_key: String, feeds: Vec<String>) -> Self {
        Self {
            fetcher,
            api_key,
            feeds,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        }
    }

    fn create_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        if !self.api_key.is_empty() {
            let value = HeaderValue::from_str(&self.api_key)
                .map_err(|e| ApiError::InvalidRequest(format!("Failed to create api key header: {}", e)))?;
            headers.insert("apikey", value);
        }
        Ok(headers)
    }
}

#[async_trait]
impl PageSource<Option<DateTime<Utc>>> for CryptoCompareClient {
    /// GET /data/v2/news/?lang=EN&sortOrder=latest[&lTs=<seconds>]
    async fn fetch_page(&self, _scope: &PageScope, before: &Option<DateTime<Utc>>) -> Result<RawPage, ApiError> {
        let mut params = vec![("lang", "EN".to_string()), ("sortOrder", "latest".to_string())];
        if !self.feeds.is_empty() {
            params.push(("feeds", self.feeds.join(",")));
        }
        if let Some(before) = before {
            params.push(("lTs", before.timestamp().to_string()));
        }
        let url = Url::parse_with_params(&self.base_url, &params)
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        let news: NewsResponse = self.fetcher.fetch_json(url.as_str(), &self.create_headers()?).await?;

        let now = Utc::now();
        Ok(RawPage {
            items: news.data.into_iter().map(|a| a.into_item(now)).collect(),
            continuation: None,
        })
    }
}
