//! Sentiment labels and classified news points

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl Sentiment {
    /// Anything other than the three known labels reads as neutral
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "bullish" => Sentiment::Bullish,
            "bearish" => Sentiment::Bearish,
            _ => Sentiment::Neutral,
        }
    }
}

impl<'de> Deserialize<'de> for Sentiment {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Sentiment::parse(&raw))
    }
}

pub const DEFAULT_TIMEFRAME: &str = "medium_term";

/// A classifier verdict for one news item, matched back by `ts`
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentLabel {
    pub ts: i64,
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub reason: String,
    pub is_price_news: bool,
    pub timeframe: Option<String>,
}

/// A news item joined with its label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedNewsPoint {
    pub t: i64,
    pub title: String,
    pub link: String,
    pub source: String,
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub reason: String,
    #[serde(rename = "isPriceNews")]
    pub is_price_news: bool,
    pub timeframe: String,
    /// Interpolated market price at `t`, when a series was available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// Clamp into `[0, 1]`; NaN becomes the neutral 0.5
pub fn clamp_confidence(raw: f64) -> f64 {
    if raw.is_nan() {
        0.5
    } else {
        raw.clamp(0.0, 1.0)
    }
}
