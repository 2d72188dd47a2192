use std::sync::Arc;

use chrono::Duration;
use reqwest::Client as HttpClient;
use tracing::{info, warn};

use crate::api::binance::BinanceClient;
use crate::api::coingecko::{ApiKey, CoinGeckoClient, CoinGeckoRange, CoinGeckoRolling};
use crate::api::cryptocompare::{feed_key, CryptoCompareClient};
use crate::api::cryptopanic::CryptoPanicClient;
use crate::api::feedly::FeedlyClient;
use crate::api::feeds::RssFeedClient;
use crate::api::fetcher::ResilientFetcher;
use crate::api::openai::LlmClassifier;
use crate::api::provider::CurveProvider;
use crate::config::{Config, NewsProvider};
use crate::models::Feed;
use crate::services::{
    CurveChain, CurveService, NewsPointsService, NewsService, NewsSettings, NewsStrategy, SentimentCache,
};
use crate::utils::clock::{Clock, SystemClock};

/// Shared application state, passed to all route handlers via `axum::extract::State`.
pub struct AppState {
    pub clock: Arc<dyn Clock>,
    pub curves: Arc<CurveService>,
    pub news_points: NewsPointsService,
}

fn news_strategy(config: &Config, http: &HttpClient, feeds: &[Feed]) -> NewsStrategy {
    let settings = config.fetch_settings();
    let effective = config.effective_news_provider();
    if effective != config.news_provider {
        warn!("{:?} selected without a credential, falling back to RSS feeds", config.news_provider);
    }

    match effective {
        NewsProvider::Rss => {
            NewsStrategy::Flat(Arc::new(RssFeedClient::new(ResilientFetcher::new("RSS", http.clone(), settings))))
        }
        NewsProvider::CryptoPanic => NewsStrategy::PageNumber(Arc::new(CryptoPanicClient::new(
            ResilientFetcher::new("CryptoPanic", http.clone(), settings),
            config.cryptopanic_token.clone(),
        ))),
        NewsProvider::Feedly => NewsStrategy::Continuation(Arc::new(FeedlyClient::new(
            ResilientFetcher::new("Feedly", http.clone(), settings),
            config.feedly_token.clone(),
        ))),
        NewsProvider::CryptoCompare => NewsStrategy::Timestamp(Arc::new(CryptoCompareClient::new(
            ResilientFetcher::new("CryptoCompare", http.clone(), settings),
            config.cryptocompare_api_key.clone(),
            feeds.iter().map(|f| feed_key(&f.source)).collect(),
        ))),
    }
}

impl AppState {
    pub fn from_config(config: &Config) -> Arc<Self> {
        let http = HttpClient::new();
        let settings = config.fetch_settings();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        // Market data: CoinGecko range, CoinGecko rolling (long windows), Binance
        let coingecko = Arc::new(CoinGeckoClient::new(
            ResilientFetcher::new("CoinGecko", http.clone(), settings.clone()),
            ApiKey::from_keys(&config.coingecko_api_key, &config.coingecko_demo_api_key),
        ));
        let providers: Vec<Arc<dyn CurveProvider>> = vec![
            Arc::new(CoinGeckoRange(coingecko.clone())),
            Arc::new(CoinGeckoRolling::new(coingecko, clock.clone())),
            Arc::new(BinanceClient::new(ResilientFetcher::new("Binance", http.clone(), settings.clone()))),
        ];
        let curves = Arc::new(CurveService::new(CurveChain::new(providers), config.http_concurrency));

        // News
        let feeds = Feed::defaults();
        let strategy = news_strategy(config, &http, &feeds);
        info!("News provider: {}", strategy.name());
        let news = NewsService::new(
            strategy,
            feeds,
            NewsSettings {
                default_since_hours: config.news_since_hours,
                max_pages: config.news_max_pages.max(1),
                per_page: config.news_per_page.max(1),
            },
            clock.clone(),
        );

        // Sentiment: one attempt per classification, with a longer timeout
        let mut classifier_settings = settings;
        classifier_settings.max_attempts = 1;
        classifier_settings.timeout *= 4;
        let classifier = LlmClassifier::new(
            ResilientFetcher::new("OpenAI", http, classifier_settings),
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            config.model.clone(),
        );
        if config.openai_api_key.is_empty() {
            warn!("OPENAI_API_KEY is not set, news points will carry neutral fallback labels");
        }
        let sentiment = SentimentCache::new(
            Arc::new(classifier),
            clock.clone(),
            Duration::milliseconds(config.news_cache_ttl_ms as i64),
            config.news_cache_capacity,
        );

        let news_points = NewsPointsService::new(
            Arc::new(news),
            Arc::new(sentiment),
            curves.clone(),
            config.news_classify_limit,
        );

        Arc::new(Self { clock, curves, news_points })
    }
}
