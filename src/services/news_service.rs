use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::api::provider::{FeedSource, PageScope, PageSource};
use crate::models::news::sort_newest_first;
use crate::models::{Feed, NewsBatch, NewsQuery};
use crate::services::news_strategies::{
    fetch_flat, ContinuationPolicy, PageNumberPolicy, TimestampPolicy, DEEP_MIN_PER_PAGE,
};
use crate::utils::clock::Clock;
use crate::utils::page::{paginate, Paged, StopReason};

/// The one news backend a process is configured with
pub enum NewsStrategy {
    /// Plain RSS/Atom feeds
    Flat(Arc<dyn FeedSource>),
    /// Page-number API (CryptoPanic)
    PageNumber(Arc<dyn PageSource<u32>>),
    /// Continuation-token API, walked once per feed (Feedly)
    Continuation(Arc<dyn PageSource<Option<String>>>),
    /// Timestamp-cursor API (CryptoCompare)
    Timestamp(Arc<dyn PageSource<Option<DateTime<Utc>>>>),
}

impl NewsStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            NewsStrategy::Flat(_) => "rss",
            NewsStrategy::PageNumber(_) => "cryptopanic",
            NewsStrategy::Continuation(_) => "feedly",
            NewsStrategy::Timestamp(_) => "cryptocompare",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewsSettings {
    /// Lookback used when a query has neither a window nor its own age limit
    pub default_since_hours: f64,
    /// Page budget for the timestamp-cursor API
    pub max_pages: usize,
    /// Minimum page size for the timestamp-cursor API
    pub per_page: usize,
}

impl Default for NewsSettings {
    fn default() -> Self {
        Self {
            default_since_hours: 72.0,
            max_pages: 4,
            per_page: 50,
        }
    }
}

/// Fetches normalized news through the configured strategy
pub struct NewsService {
    strategy: NewsStrategy,
    feeds: Vec<Feed>,
    settings: NewsSettings,
    clock: Arc<dyn Clock>,
}

/// A walk that failed before its first page delivered nothing at all
fn failed_outright(paged: &Paged) -> bool {
    paged.stop == StopReason::FetchFailed && paged.pages == 0
}

impl NewsService {
    pub fn new(strategy: NewsStrategy, feeds: Vec<Feed>, settings: NewsSettings, clock: Arc<dyn Clock>) -> Self {
        Self { strategy, feeds, settings, clock }
    }

    /// Fetch news for `query`: window-filtered, newest first
    ///
    /// Never fails; sources that could not be reached are listed in
    /// `skipped_sources`.
    pub async fn fetch_news(&self, query: &NewsQuery) -> NewsBatch {
        let now = self.clock.now();
        let since = self.settings.default_since_hours;

        let mut batch = match &self.strategy {
            NewsStrategy::Flat(source) => return fetch_flat(source.as_ref(), &self.feeds, query, now, since).await,
            NewsStrategy::PageNumber(source) => {
                let policy = PageNumberPolicy::for_query(query);
                let scope = PageScope { coin: query.coin.clone(), feed: None, per_page: policy.per_page };
                let paged = paginate(&policy, source.as_ref(), &scope).await;
                self.single_walk(paged)
            }
            NewsStrategy::Continuation(source) => {
                let policy = ContinuationPolicy::default();
                let per_page = query.per_feed.max(DEEP_MIN_PER_PAGE);
                let mut batch = NewsBatch::default();
                for feed in &self.feeds {
                    let scope = PageScope { coin: query.coin.clone(), feed: Some(feed.clone()), per_page };
                    let paged = paginate(&policy, source.as_ref(), &scope).await;
                    if failed_outright(&paged) {
                        warn!("Skipping feed {}: no page could be fetched", feed.source);
                        batch.skipped_sources.push(feed.source.clone());
                    }
                    batch.items.extend(paged.items);
                }
                batch
            }
            NewsStrategy::Timestamp(source) => {
                let policy = TimestampPolicy::for_query(
                    query,
                    now,
                    self.settings.per_page,
                    self.settings.max_pages,
                    since,
                );
                let scope = PageScope { coin: query.coin.clone(), feed: None, per_page: policy.per_page };
                let paged = paginate(&policy, source.as_ref(), &scope).await;
                self.single_walk(paged)
            }
        };

        batch.items.retain(|it| query.admits(it, now, since));
        sort_newest_first(&mut batch.items);
        info!(
            "Fetched {} news items via {} ({} sources skipped)",
            batch.items.len(),
            self.strategy.name(),
            batch.skipped_sources.len()
        );
        batch
    }

    fn single_walk(&self, paged: Paged) -> NewsBatch {
        let mut batch = NewsBatch::default();
        if failed_outright(&paged) {
            warn!("{} returned no pages", self.strategy.name());
            batch.skipped_sources.push(self.strategy.name().to_string());
        }
        batch.items = paged.items;
        batch
    }
}
