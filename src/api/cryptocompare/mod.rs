pub mod client;
pub mod models;

pub use client::CryptoCompareClient;
pub use models::feed_key;
