use std::env;
use std::time::Duration;

use crate::api::fetcher::FetchSettings;

/// Which news backend serves `/api/news_points`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewsProvider {
    Rss,
    CryptoPanic,
    Feedly,
    CryptoCompare,
}

impl NewsProvider {
    /// Unknown names fall back to CryptoCompare
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "rss" => NewsProvider::Rss,
            "cryptopanic" => NewsProvider::CryptoPanic,
            "feedly" => NewsProvider::Feedly,
            _ => NewsProvider::CryptoCompare,
        }
    }
}

/// Service configuration derived from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,

    // News providers
    pub news_provider: NewsProvider,
    pub cryptopanic_token: String,
    pub feedly_token: String,
    pub cryptocompare_api_key: String,
    pub news_max_pages: usize,
    pub news_per_page: usize,
    pub news_since_hours: f64,
    pub news_classify_limit: usize,

    // Sentiment cache
    pub news_cache_ttl_ms: u64,
    pub news_cache_capacity: usize,

    // Market data
    pub coingecko_api_key: String,
    pub coingecko_demo_api_key: String,

    // Upstream HTTP
    pub user_agent: String,
    pub http_max_attempts: u32,
    pub http_backoff_ms: u64,
    pub http_timeout_secs: u64,
    pub http_concurrency: usize,
    pub http_rate_per_sec: usize,

    // Classifier
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub model: String,
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_f64(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let cryptocompare_api_key = {
            let primary = env_str("CRYPTOCOMPARE_API_KEY", "");
            if primary.is_empty() {
                env_str("CRYPTOCOMPARE_KEY", "")
            } else {
                primary
            }
        };

        Self {
            bind: env_str("BIND", "0.0.0.0"),
            port: env_u16("PORT", 8080),

            news_provider: NewsProvider::parse(&env_str("NEWS_PROVIDER", "cryptocompare")),
            cryptopanic_token: env_str("CRYPTOPANIC_TOKEN", ""),
            feedly_token: env_str("FEEDLY_TOKEN", ""),
            cryptocompare_api_key,
            news_max_pages: env_usize("NEWS_MAX_PAGES", 4),
            news_per_page: env_usize("NEWS_PER_PAGE", 50),
            news_since_hours: env_f64("NEWS_SINCE_HOURS", 72.0),
            news_classify_limit: env_usize("NEWS_CLASSIFY_LIMIT", 30),

            news_cache_ttl_ms: env_u64("NEWS_CACHE_TTL_MS", 300_000),
            news_cache_capacity: env_usize("NEWS_CACHE_CAPACITY", 256),

            coingecko_api_key: env_str("COINGECKO_API_KEY", ""),
            coingecko_demo_api_key: env_str("COINGECKO_DEMO_API_KEY", ""),

            user_agent: env_str("USER_AGENT", "market-pulse/0.1"),
            http_max_attempts: env_u32("HTTP_MAX_ATTEMPTS", 3),
            http_backoff_ms: env_u64("HTTP_BACKOFF_MS", 500),
            http_timeout_secs: env_u64("HTTP_TIMEOUT_SECS", 15),
            http_concurrency: env_usize("HTTP_CONCURRENCY", 4),
            http_rate_per_sec: env_usize("HTTP_RATE_PER_SEC", 8),

            openai_api_key: env_str("OPENAI_API_KEY", ""),
            openai_base_url: env_str("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            model: env_str("MODEL", "gpt-4o-mini"),
        }
    }

    /// Retry/throttle policy handed to every provider client
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            max_attempts: self.http_max_attempts.max(1),
            backoff_step: Duration::from_millis(self.http_backoff_ms),
            timeout: Duration::from_secs(self.http_timeout_secs.max(1)),
            max_in_flight: self.http_concurrency.max(1),
            rate_per_sec: self.http_rate_per_sec.max(1),
            user_agent: self.user_agent.clone(),
        }
    }

    /// The provider actually used, after checking its credential
    pub fn effective_news_provider(&self) -> NewsProvider {
        match self.news_provider {
            NewsProvider::CryptoPanic if self.cryptopanic_token.is_empty() => NewsProvider::Rss,
            NewsProvider::Feedly if self.feedly_token.is_empty() => NewsProvider::Rss,
            other => other,
        }
    }
}
