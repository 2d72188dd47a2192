pub mod client;
pub mod models;

pub use client::{CoinGeckoClient, CoinGeckoRange, CoinGeckoRolling};
pub use models::ApiKey;
