//! Curve summary and series result models

use serde::Serialize;
use thiserror::Error;

use super::chart::PricePoint;

/// Per-coin failure kinds for the curve chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Error)]
pub enum CurveError {
    /// No provider mapping for the ticker
    #[serde(rename = "unsupported")]
    #[error("unsupported")]
    Unsupported,
    /// Provider answered with an empty series
    #[serde(rename = "no-data")]
    #[error("no-data")]
    NoData,
    /// Every provider failed after retries
    #[serde(rename = "fetch-failed")]
    #[error("fetch-failed")]
    FetchFailed,
}

/// OHLC reduction over a window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveSummary {
    pub coin: String,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    #[serde(rename = "return")]
    pub ret: f64,
    pub samples: usize,
    pub window_start: String,
    pub window_end: String,
    pub source: String,
}

impl CurveSummary {
    /// One-line text form, return as a percentage with two decimals
    pub fn describe(&self) -> String {
        let pct = (self.ret * 10000.0).round() / 100.0;
        format!(
            "- {}: open={:.2} close={:.2} high={:.2} low={:.2} return={}% samples={}",
            self.coin, self.open, self.close, self.high, self.low, pct, self.samples
        )
    }

    /// `up`, `down` or `neutral` when |return| is under `neutral_threshold`
    pub fn trend_direction(&self, neutral_threshold: f64) -> &'static str {
        if self.ret.abs() < neutral_threshold {
            "neutral"
        } else if self.ret > 0.0 {
            "up"
        } else {
            "down"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveFailure {
    pub coin: String,
    pub error: CurveError,
    pub source: String,
}

/// One entry of a curve batch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CurveResult {
    Summary(CurveSummary),
    Failure(CurveFailure),
}

/// Raw series for one coin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinSeries {
    pub coin: String,
    pub source: String,
    pub window_start: String,
    pub window_end: String,
    pub points: Vec<PricePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesFailure {
    pub coin: String,
    pub error: CurveError,
}

/// One entry of a series batch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SeriesResult {
    Series(CoinSeries),
    Failure(SeriesFailure),
}

impl SeriesResult {
    pub fn points(&self) -> Option<&[PricePoint]> {
        match self {
            SeriesResult::Series(s) => Some(&s.points),
            SeriesResult::Failure(_) => None,
        }
    }
}
