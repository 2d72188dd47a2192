use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::models::coin::is_news_about;
use crate::models::news::sort_newest_first;
use crate::models::{ClassifiedNewsPoint, NewsItem, NewsQuery, TimeWindow};
use crate::services::chart_service::price_at;
use crate::services::curve_service::CurveService;
use crate::services::news_service::NewsService;
use crate::services::sentiment_service::SentimentCache;

/// Items requested per feed when building news points
pub const PER_FEED: usize = 60;
/// Points returned per request
pub const MAX_POINTS: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct NewsPoints {
    pub window: String,
    pub coin: String,
    pub points: Vec<ClassifiedNewsPoint>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_sources: Vec<String>,
}

/// Items about `coin`, newest first, at most `limit`
pub fn select_for_classification(items: Vec<NewsItem>, coin: &str, limit: usize) -> Vec<NewsItem> {
    let mut relevant: Vec<NewsItem> = items.into_iter().filter(|it| is_news_about(it, coin)).collect();
    sort_newest_first(&mut relevant);
    relevant.truncate(limit);
    relevant
}

/// News aligned to the price curve: fetch, filter, classify, place on the series
pub struct NewsPointsService {
    news: Arc<NewsService>,
    sentiment: Arc<SentimentCache>,
    curves: Arc<CurveService>,
    classify_limit: usize,
}

impl NewsPointsService {
    pub fn new(
        news: Arc<NewsService>,
        sentiment: Arc<SentimentCache>,
        curves: Arc<CurveService>,
        classify_limit: usize,
    ) -> Self {
        Self { news, sentiment, curves, classify_limit }
    }

    pub async fn news_points(&self, coin: &str, window: &TimeWindow) -> NewsPoints {
        let query = NewsQuery::for_window(window, PER_FEED, Some(coin));
        let limit = self.classify_limit;
        let news = &self.news;

        let mut skipped_sources = Vec::new();
        let skipped = &mut skipped_sources;
        let mut points = self
            .sentiment
            .get(coin, window, move || async move {
                let batch = news.fetch_news(&query).await;
                *skipped = batch.skipped_sources;
                select_for_classification(batch.items, coin, limit)
            })
            .await;

        points.sort_by_key(|p| p.t);
        points.truncate(MAX_POINTS);

        if !points.is_empty() {
            let series = self.curves.get_series(coin, window).await;
            match series.points() {
                Some(prices) => {
                    for p in points.iter_mut() {
                        p.price = price_at(prices, p.t);
                    }
                }
                None => debug!("No series for {}, news points left without prices", coin),
            }
        }

        NewsPoints {
            window: window.label(),
            coin: coin.to_string(),
            points,
            skipped_sources,
        }
    }
}
