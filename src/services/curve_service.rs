use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::api::provider::CurveProvider;
use crate::models::chart::sort_ascending;
use crate::models::coin;
use crate::models::{
    CoinSeries, CurveError, CurveFailure, CurveResult, CurveSummary, PricePoint, SeriesFailure, SeriesResult,
    TimeWindow,
};

/// Source tag used when no provider was consulted
const NO_SOURCE: &str = "none";

/// OHLC reduction over a series already sorted ascending
///
/// Returns None for an empty series.
pub fn summarize(coin: &str, points: &[PricePoint], window: &TimeWindow, source: &str) -> Option<CurveSummary> {
    let first = points.first()?;
    let last = points.last()?;
    let (high, low) = points
        .iter()
        .fold((f64::NEG_INFINITY, f64::INFINITY), |(hi, lo), p| (hi.max(p.price), lo.min(p.price)));
    let open = first.price;
    let close = last.price;
    let ret = if open == 0.0 { 0.0 } else { close / open - 1.0 };

    Some(CurveSummary {
        coin: coin.to_string(),
        open,
        close,
        high,
        low,
        ret,
        samples: points.len(),
        window_start: window.from_iso(),
        window_end: window.to_iso(),
        source: source.to_string(),
    })
}

/// A series together with the provider that produced it
#[derive(Debug, Clone)]
pub struct SourcedSeries {
    pub points: Vec<PricePoint>,
    pub source: &'static str,
}

/// Ordered provider chain; the first non-empty series wins
pub struct CurveChain {
    providers: Vec<Arc<dyn CurveProvider>>,
}

impl CurveChain {
    pub fn new(providers: Vec<Arc<dyn CurveProvider>>) -> Self {
        Self { providers }
    }

    fn primary_source(&self) -> &'static str {
        self.providers.first().map(|p| p.source()).unwrap_or(NO_SOURCE)
    }

    /// Fetch a sorted series for `ticker`, falling through providers in order
    ///
    /// On failure the error is the last consulted provider's outcome, tagged
    /// with that provider's source.
    pub async fn fetch(
        &self,
        ticker: &str,
        window: &TimeWindow,
    ) -> Result<SourcedSeries, (CurveError, &'static str)> {
        let Some(info) = coin::lookup(ticker) else {
            debug!("{} has no provider mapping", ticker);
            return Err((CurveError::Unsupported, self.primary_source()));
        };

        let mut outcome = (CurveError::FetchFailed, self.primary_source());
        for provider in self.providers.iter().filter(|p| p.covers(window)) {
            match provider.fetch_series(info, window).await {
                Ok(mut points) if !points.is_empty() => {
                    sort_ascending(&mut points);
                    debug!("{} series for {}: {} points", provider.source(), ticker, points.len());
                    return Ok(SourcedSeries { points, source: provider.source() });
                }
                Ok(_) => {
                    warn!("{} returned no data for {}, trying next provider", provider.source(), ticker);
                    outcome = (CurveError::NoData, provider.source());
                }
                Err(e) => {
                    warn!("{} failed for {}: {}", provider.source(), ticker, e);
                    outcome = (CurveError::FetchFailed, provider.source());
                }
            }
        }
        Err(outcome)
    }
}

/// Curve and series lookups for coin batches
pub struct CurveService {
    chain: CurveChain,
    concurrency: usize,
}

impl CurveService {
    pub fn new(chain: CurveChain, concurrency: usize) -> Self {
        Self { chain, concurrency: concurrency.max(1) }
    }

    pub async fn get_curve(&self, ticker: &str, window: &TimeWindow) -> CurveResult {
        match self.chain.fetch(ticker, window).await {
            Ok(series) => match summarize(ticker, &series.points, window, series.source) {
                Some(summary) => CurveResult::Summary(summary),
                None => CurveResult::Failure(CurveFailure {
                    coin: ticker.to_string(),
                    error: CurveError::NoData,
                    source: series.source.to_string(),
                }),
            },
            Err((error, source)) => CurveResult::Failure(CurveFailure {
                coin: ticker.to_string(),
                error,
                source: source.to_string(),
            }),
        }
    }

    pub async fn get_series(&self, ticker: &str, window: &TimeWindow) -> SeriesResult {
        match self.chain.fetch(ticker, window).await {
            Ok(series) => SeriesResult::Series(CoinSeries {
                coin: ticker.to_string(),
                source: series.source.to_string(),
                window_start: window.from_iso(),
                window_end: window.to_iso(),
                points: series.points,
            }),
            Err((error, _)) => SeriesResult::Failure(SeriesFailure { coin: ticker.to_string(), error }),
        }
    }

    /// Summaries in input order; one coin's failure never aborts the rest
    pub async fn get_curves(&self, tickers: &[String], window: &TimeWindow) -> Vec<CurveResult> {
        info!("Fetching curves for {} coins over {}", tickers.len(), window.label());
        let pending: Vec<_> = tickers.iter().map(|t| self.get_curve(t, window)).collect();
        stream::iter(pending)
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// Raw series in input order; one coin's failure never aborts the rest
    pub async fn get_series_batch(&self, tickers: &[String], window: &TimeWindow) -> Vec<SeriesResult> {
        info!("Fetching series for {} coins over {}", tickers.len(), window.label());
        let pending: Vec<_> = tickers.iter().map(|t| self.get_series(t, window)).collect();
        stream::iter(pending)
            .buffered(self.concurrency)
            .collect()
            .await
    }
}
