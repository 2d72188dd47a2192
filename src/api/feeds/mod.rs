pub mod client;

pub use client::RssFeedClient;
