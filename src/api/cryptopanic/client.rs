use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::HeaderMap;
use reqwest::Url;

use super::models::PostsResponse;
use crate::api::fetcher::{ApiError, ResilientFetcher};
use crate::api::provider::{PageScope, PageSource, RawPage};

/// CryptoPanic posts API, paginated by page number (1-based)
pub struct CryptoPanicClient {
    fetcher: ResilientFetcher,
    auth_token: String,
    base_url: String,
}

impl CryptoPanicClient {
    const DEFAULT_BASE_URL: &'static str = "https://cryptopanic.com/api/v1";

    pub fn new(fetcher: ResilientFetcher, auth_token: String) -> Self {
        Self {
            fetcher,
            auth_token,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        }
    }

    fn page_url(&self, coin: Option<&str>, page: u32) -> Result<Url, ApiError> {
        let mut params = vec![
            ("auth_token", self.auth_token.clone()),
            ("kind", "news".to_string()),
            ("filter", "all".to_string()),
        ];
        if let Some(coin) = coin {
            params.push(("currencies", coin.to_lowercase()));
        }
        params.push(("page", page.to_string()));

        Url::parse_with_params(&format!("{}/posts/", self.base_url), &params)
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))
    }
}

#[async_trait]
impl PageSource<u32> for CryptoPanicClient {
    /// GET /posts/?page=N
    async fn fetch_page(&self, scope: &PageScope, page: &u32) -> Result<RawPage, ApiError> {
        if self.auth_token.is_empty() {
            return Err(ApiError::InvalidRequest("CryptoPanic token not configured".to_string()));
        }
        let url = self.page_url(scope.coin.as_deref(), *page)?;
        let posts: PostsResponse = self.fetcher.fetch_json(url.as_str(), &HeaderMap::new()).await?;

        let now = Utc::now();
        Ok(RawPage {
            items: posts.results.into_iter().map(|p| p.into_item(now)).collect(),
            continuation: None,
        })
    }
}
