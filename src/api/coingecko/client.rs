use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Url;

use super::models::{ApiKey, MarketChartResponse};
use crate::api::fetcher::{ApiError, ResilientFetcher};
use crate::api::provider::CurveProvider;
use crate::models::{CoinInfo, PricePoint, TimeWindow};
use crate::utils::clock::Clock;

pub const SOURCE: &str = "CoinGecko";

/// Windows longer than this also try the rolling chart endpoint
const ROLLING_MIN_SPAN_DAYS: i64 = 90;
const ROLLING_MAX_DAYS: i64 = 366;

/// CoinGecko market chart client
pub struct CoinGeckoClient {
    fetcher: ResilientFetcher,
    api_key: ApiKey,
    base_url: String,
}

impl CoinGeckoClient {
    const DEFAULT_BASE_URL: &'static str = "https://api.coingecko.com/api/v3";

    pub fn new(fetcher: ResilientFetcher, api_key: ApiKey) -> Self {
        Self {
            fetcher,
            api_key,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn create_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        let (name, key) = match &self.api_key {
            ApiKey::Pro(key) => ("x-cg-pro-api-key", key),
            ApiKey::Demo(key) => ("x-cg-demo-api-key", key),
            ApiKey::None => return Ok(headers),
        };
        let value = HeaderValue::from_str(key)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to create api key header: {}", e)))?;
        headers.insert(name, value);
        Ok(headers)
    }

    /// GET /coins/{id}/market_chart/range
    pub async fn market_chart_range(
        &self,
        coin_id: &str,
        from_sec: i64,
        to_sec: i64,
    ) -> Result<Vec<PricePoint>, ApiError> {
        let url = Url::parse_with_params(
            &format!("{}/coins/{}/market_chart/range", self.base_url, coin_id),
            &[
                ("vs_currency", "usd".to_string()),
                ("from", from_sec.to_string()),
                ("to", to_sec.to_string()),
            ],
        )
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        let chart: MarketChartResponse = self.fetcher.fetch_json(url.as_str(), &self.create_headers()?).await?;
        Ok(chart.into_points())
    }

    /// GET /coins/{id}/market_chart?days=N
    pub async fn market_chart_days(&self, coin_id: &str, days: i64) -> Result<Vec<PricePoint>, ApiError> {
        let url = Url::parse_with_params(
            &format!("{}/coins/{}/market_chart", self.base_url, coin_id),
            &[("vs_currency", "usd".to_string()), ("days", days.to_string())],
        )
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        let chart: MarketChartResponse = self.fetcher.fetch_json(url.as_str(), &self.create_headers()?).await?;
        Ok(chart.into_points())
    }
}

/// Primary provider: the ranged chart endpoint
pub struct CoinGeckoRange(pub Arc<CoinGeckoClient>);

#[async_trait]
impl CurveProvider for CoinGeckoRange {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn fetch_series(&self, coin: &CoinInfo, window: &TimeWindow) -> Result<Vec<PricePoint>, ApiError> {
        self.0
            .market_chart_range(coin.coingecko_id, window.from.timestamp(), window.to.timestamp())
            .await
    }
}

/// Rolling `days=N` chart trimmed to the window, for long windows only
pub struct CoinGeckoRolling {
    client: Arc<CoinGeckoClient>,
    clock: Arc<dyn Clock>,
}

impl CoinGeckoRolling {
    pub fn new(client: Arc<CoinGeckoClient>, clock: Arc<dyn Clock>) -> Self {
        Self { client, clock }
    }
}

/// Days of history needed at `now` to reach back to the window start, capped
pub fn rolling_days(now: DateTime<Utc>, window: &TimeWindow) -> i64 {
    let days = (now - window.from).num_days() + 1;
    days.clamp(1, ROLLING_MAX_DAYS)
}

/// Keep the points inside `[from, to]`
pub fn trim_to_window(points: Vec<PricePoint>, window: &TimeWindow) -> Vec<PricePoint> {
    let (from, to) = (window.from_ms(), window.to_ms());
    points.into_iter().filter(|p| p.t >= from && p.t <= to).collect()
}

#[async_trait]
impl CurveProvider for CoinGeckoRolling {
    fn source(&self) -> &'static str {
        SOURCE
    }

    fn covers(&self, window: &TimeWindow) -> bool {
        window.span() > Duration::days(ROLLING_MIN_SPAN_DAYS)
    }

    async fn fetch_series(&self, coin: &CoinInfo, window: &TimeWindow) -> Result<Vec<PricePoint>, ApiError> {
        let days = rolling_days(self.clock.now(), window);
        let points = self.client.market_chart_days(coin.coingecko_id, days).await?;
        Ok(trim_to_window(points, window))
    }
}
