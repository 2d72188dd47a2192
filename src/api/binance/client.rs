use async_trait::async_trait;
use chrono::Duration;
use reqwest::header::HeaderMap;
use reqwest::Url;
use serde_json::Value;

use super::models::klines_to_points;
use crate::api::fetcher::{ApiError, ResilientFetcher};
use crate::api::provider::CurveProvider;
use crate::models::{CoinInfo, PricePoint, TimeWindow};

pub const SOURCE: &str = "Binance";

/// Kline interval by window span: finer sampling for short windows
pub fn interval_for_span(span: Duration) -> &'static str {
    if span <= Duration::hours(6) {
        "15m"
    } else if span <= Duration::hours(12) {
        "30m"
    } else if span <= Duration::hours(36) {
        "1h"
    } else {
        "1d"
    }
}

/// Binance spot kline client, used as the fallback curve provider
pub struct BinanceClient {
    fetcher: ResilientFetcher,
    base_url: String,
}

impl BinanceClient {
    const DEFAULT_BASE_URL: &'static str = "https://api.binance.com/api/v3";

    pub fn new(fetcher: ResilientFetcher) -> Self {
        Self {
            fetcher,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        }
    }

    /// GET /klines
    pub async fn klines(
        &self,
        symbol: &str,
        interval: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<PricePoint>, ApiError> {
        let url = Url::parse_with_params(
            &format!("{}/klines", self.base_url),
            &[
                ("symbol", symbol.to_string()),
                ("interval", interval.to_string()),
                ("startTime", start_ms.to_string()),
                ("endTime", end_ms.to_string()),
            ],
        )
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        let rows: Vec<Vec<Value>> = self.fetcher.fetch_json(url.as_str(), &HeaderMap::new()).await?;
        klines_to_points(rows)
    }
}

#[async_trait]
impl CurveProvider for BinanceClient {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn fetch_series(&self, coin: &CoinInfo, window: &TimeWindow) -> Result<Vec<PricePoint>, ApiError> {
        let interval = interval_for_span(window.span());
        self.klines(coin.binance_symbol, interval, window.from_ms(), window.to_ms())
            .await
    }
}
