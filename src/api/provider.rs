//! Provider traits at the adapter boundary.
//!
//! Every upstream client implements one of these and normalizes its response
//! into `PricePoint` / `NewsItem` before returning. Nothing provider-specific
//! crosses this boundary, which is also where tests substitute fakes.

use async_trait::async_trait;

use super::fetcher::ApiError;
use crate::models::{CoinInfo, Feed, NewsItem, PricePoint, TimeWindow};

/// A market-data source able to return a price series for a window
#[async_trait]
pub trait CurveProvider: Send + Sync {
    /// Source tag attached to results from this provider
    fn source(&self) -> &'static str;

    /// Whether this provider should be tried for `window` at all
    fn covers(&self, _window: &TimeWindow) -> bool {
        true
    }

    /// Fetch the series for `coin` over `window`; may be empty
    async fn fetch_series(&self, coin: &CoinInfo, window: &TimeWindow) -> Result<Vec<PricePoint>, ApiError>;
}

/// A flat (non-paginated) news feed
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the whole feed
    async fn fetch_feed(&self, feed: &Feed) -> Result<Vec<NewsItem>, ApiError>;
}

/// Request context that stays fixed across the pages of one fetch
#[derive(Debug, Clone, Default)]
pub struct PageScope {
    pub coin: Option<String>,
    pub feed: Option<Feed>,
    pub per_page: usize,
}

/// One normalized page from a paginated news API
#[derive(Debug, Clone, Default)]
pub struct RawPage {
    /// Items in upstream order
    pub items: Vec<NewsItem>,
    /// Opaque continuation token, for token-cursor APIs
    pub continuation: Option<String>,
}

/// A paginated news API addressed by cursor `C`
#[async_trait]
pub trait PageSource<C: Send + Sync>: Send + Sync {
    async fn fetch_page(&self, scope: &PageScope, cursor: &C) -> Result<RawPage, ApiError>;
}
