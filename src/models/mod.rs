//! Data models for market-pulse services
//!
//! This module organizes the normalized shapes every provider adapter produces
//! and the result structs handed to the HTTP layer.

pub mod chart;
pub mod coin;
pub mod news;
pub mod price;
pub mod sentiment;
pub mod window;

// Re-export commonly used types for convenience
pub use chart::PricePoint;
pub use coin::CoinInfo;
pub use news::{Feed, NewsBatch, NewsItem, NewsQuery};
pub use price::{CoinSeries, CurveError, CurveFailure, CurveResult, CurveSummary, SeriesFailure, SeriesResult};
pub use sentiment::{ClassifiedNewsPoint, Sentiment, SentimentLabel};
pub use window::{TimeWindow, WindowKind};
