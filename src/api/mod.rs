pub mod fetcher;
pub mod provider;

pub mod binance;
pub mod coingecko;
pub mod cryptocompare;
pub mod cryptopanic;
pub mod feedly;
pub mod feeds;
pub mod openai;

pub use fetcher::{ApiError, FetchSettings, ResilientFetcher};
pub use provider::{CurveProvider, FeedSource, PageScope, PageSource, RawPage};
