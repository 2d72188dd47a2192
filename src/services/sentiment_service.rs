use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::fetcher::ApiError;
use crate::models::sentiment::{clamp_confidence, DEFAULT_TIMEFRAME};
use crate::models::{ClassifiedNewsPoint, NewsItem, Sentiment, SentimentLabel, TimeWindow};
use crate::utils::clock::Clock;

/// Reason attached to every label when classification failed
pub const FALLBACK_REASON: &str = "fallback";

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("classifier API key is not configured")]
    MissingApiKey,
    #[error("classifier request failed: {0}")]
    Request(#[from] ApiError),
    #[error("classifier returned no content")]
    EmptyReply,
    #[error("classifier output malformed: {0}")]
    Malformed(String),
}

/// External sentiment labeler
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Label `items` for `coin`; labels are matched back to items by `ts`
    async fn classify(&self, coin: &str, items: &[NewsItem]) -> Result<Vec<SentimentLabel>, ClassifyError>;
}

struct CacheEntry {
    ts: DateTime<Utc>,
    data: Vec<ClassifiedNewsPoint>,
}

fn point(item: &NewsItem, label: Option<SentimentLabel>) -> ClassifiedNewsPoint {
    let (sentiment, confidence, reason, is_price_news, timeframe) = match label {
        Some(l) => (l.sentiment, clamp_confidence(l.confidence), l.reason, l.is_price_news, l.timeframe),
        None => (Sentiment::Neutral, 0.5, String::new(), false, None),
    };
    ClassifiedNewsPoint {
        t: item.pub_date.timestamp_millis(),
        title: item.title.clone(),
        link: item.link.clone(),
        source: item.source.clone(),
        sentiment,
        confidence,
        reason,
        is_price_news,
        timeframe: timeframe.unwrap_or_else(|| DEFAULT_TIMEFRAME.to_string()),
        price: None,
    }
}

/// Pair each item with the label carrying its timestamp
///
/// Items sharing a timestamp share its label.
pub fn join_labels(items: &[NewsItem], labels: Vec<SentimentLabel>) -> Vec<ClassifiedNewsPoint> {
    let by_ts: HashMap<i64, SentimentLabel> = labels.into_iter().map(|l| (l.ts, l)).collect();
    items
        .iter()
        .map(|it| point(it, by_ts.get(&it.pub_date.timestamp_millis()).cloned()))
        .collect()
}

/// Every item neutral at 0.5 confidence
pub fn fallback_points(items: &[NewsItem]) -> Vec<ClassifiedNewsPoint> {
    items
        .iter()
        .map(|it| {
            let mut p = point(it, None);
            p.reason = FALLBACK_REASON.to_string();
            p
        })
        .collect()
}

/// `coin:kind:from:to`
pub fn cache_key(coin: &str, window: &TimeWindow) -> String {
    format!("{}:{}:{}:{}", coin, window.label(), window.from_iso(), window.to_iso())
}

/// Memoized classification results, keyed by coin and window
///
/// At most one classification runs per key at a time; concurrent callers for
/// the same key wait for it and share the stored result.
pub struct SentimentCache {
    classifier: Arc<dyn Classifier>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<String, CacheEntry>>,
    inflight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl SentimentCache {
    pub fn new(classifier: Arc<dyn Classifier>, clock: Arc<dyn Clock>, ttl: Duration, capacity: usize) -> Self {
        Self {
            classifier,
            clock,
            ttl,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    fn fresh(&self, key: &str) -> Option<Vec<ClassifiedNewsPoint>> {
        let now = self.clock.now();
        let entries = lock(&self.entries);
        entries
            .get(key)
            .filter(|e| now - e.ts < self.ttl)
            .map(|e| e.data.clone())
    }

    fn gate(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        lock(&self.inflight).entry(key.to_string()).or_default().clone()
    }

    fn insert(&self, key: String, data: Vec<ClassifiedNewsPoint>) {
        let now = self.clock.now();
        let mut entries = lock(&self.entries);
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            entries.retain(|_, e| now - e.ts < self.ttl);
            if entries.len() >= self.capacity {
                if let Some(oldest) = entries.iter().min_by_key(|(_, e)| e.ts).map(|(k, _)| k.clone()) {
                    debug!("Sentiment cache full, evicting {}", oldest);
                    entries.remove(&oldest);
                }
            }
        }
        entries.insert(key, CacheEntry { ts: now, data });
    }

    async fn classify(&self, coin: &str, items: &[NewsItem]) -> Vec<ClassifiedNewsPoint> {
        if items.is_empty() {
            return Vec::new();
        }
        match self.classifier.classify(coin, items).await {
            Ok(labels) => join_labels(items, labels),
            Err(e) => {
                warn!("Classification for {} failed, labeling {} items neutral: {}", coin, items.len(), e);
                fallback_points(items)
            }
        }
    }

    /// Cached points for `coin` over `window`, classifying `load()`'s items on a miss
    ///
    /// Never fails: a classifier error degrades to neutral labels.
    pub async fn get<F, Fut>(&self, coin: &str, window: &TimeWindow, load: F) -> Vec<ClassifiedNewsPoint>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Vec<NewsItem>>,
    {
        let key = cache_key(coin, window);
        if let Some(hit) = self.fresh(&key) {
            debug!("Sentiment cache hit for {}", key);
            return hit;
        }

        let gate = self.gate(&key);
        let _turn = gate.lock().await;
        if let Some(hit) = self.fresh(&key) {
            debug!("Sentiment cache filled while waiting for {}", key);
            return hit;
        }

        let items = load().await;
        info!("Classifying {} items for {}", items.len(), key);
        let points = self.classify(coin, &items).await;
        self.insert(key.clone(), points.clone());
        lock(&self.inflight).remove(&key);
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::window_service;
    use crate::utils::clock::ManualClock;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap()
    }

    fn items() -> Vec<NewsItem> {
        vec![
            NewsItem {
                title: "Bitcoin ETF inflows surge".to_string(),
                link: "https://example.com/1".to_string(),
                pub_date: Utc.with_ymd_and_hms(2024, 3, 14, 9, 0, 0).unwrap(),
                source: "CoinDesk".to_string(),
            },
            NewsItem {
                title: "Exchange hacked".to_string(),
                link: "https://example.com/2".to_string(),
                pub_date: Utc.with_ymd_and_hms(2024, 3, 14, 15, 30, 0).unwrap(),
                source: "CoinTelegraph".to_string(),
            },
        ]
    }

    /// Labels the first item bullish and leaves the rest unlabeled
    struct CountingClassifier {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Classifier for CountingClassifier {
        async fn classify(&self, _coin: &str, items: &[NewsItem]) -> Result<Vec<SentimentLabel>, ClassifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            if self.fail {
                return Err(ClassifyError::EmptyReply);
            }
            Ok(vec![SentimentLabel {
                ts: items[0].pub_date.timestamp_millis(),
                sentiment: Sentiment::Bullish,
                confidence: 0.8,
                reason: "Since inflows rise, then demand rises".to_string(),
                is_price_news: true,
                timeframe: None,
            }])
        }
    }

    fn cache(fail: bool) -> (Arc<CountingClassifier>, Arc<ManualClock>, SentimentCache) {
        let classifier = Arc::new(CountingClassifier { calls: AtomicUsize::new(0), fail });
        let clock = Arc::new(ManualClock::at(now()));
        let cache = SentimentCache::new(classifier.clone(), clock.clone(), Duration::minutes(5), 16);
        (classifier, clock, cache)
    }

    #[tokio::test]
    async fn test_classifies_once_within_ttl() {
        let (classifier, clock, cache) = cache(false);
        let window = window_service::yesterday(now());

        let first = cache.get("BTC", &window, || async { items() }).await;
        clock.advance(Duration::minutes(4));
        let second = cache.get("BTC", &window, || async { items() }).await;

        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(first[0].sentiment, Sentiment::Bullish);
        assert_eq!(first[0].timeframe, DEFAULT_TIMEFRAME);
        assert_eq!(first[1].sentiment, Sentiment::Neutral);
        assert_eq!(first[1].confidence, 0.5);
        assert_eq!(first[1].reason, "");
    }

    #[tokio::test]
    async fn test_reclassifies_after_expiry() {
        let (classifier, clock, cache) = cache(false);
        let window = window_service::yesterday(now());

        cache.get("BTC", &window, || async { items() }).await;
        clock.advance(Duration::minutes(5));
        cache.get("BTC", &window, || async { items() }).await;

        assert_eq!(classifier.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_neutral() {
        let (_, _, cache) = cache(true);
        let window = window_service::yesterday(now());

        let points = cache.get("ETH", &window, || async { items() }).await;
        assert_eq!(points.len(), 2);
        for p in &points {
            assert_eq!(p.sentiment, Sentiment::Neutral);
            assert_eq!(p.confidence, 0.5);
            assert_eq!(p.reason, FALLBACK_REASON);
            assert!(!p.is_price_news);
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_classification() {
        let (classifier, _, cache) = cache(false);
        let window = window_service::yesterday(now());

        let (a, b, c) = tokio::join!(
            cache.get("BTC", &window, || async { items() }),
            cache.get("BTC", &window, || async { items() }),
            cache.get("BTC", &window, || async { items() }),
        );

        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let classifier = Arc::new(CountingClassifier { calls: AtomicUsize::new(0), fail: false });
        let clock = Arc::new(ManualClock::at(now()));
        let cache = SentimentCache::new(classifier, clock.clone(), Duration::hours(1), 2);
        let window = window_service::yesterday(now());

        for coin in ["BTC", "ETH", "SOL"] {
            cache.get(coin, &window, || async { items() }).await;
            clock.advance(Duration::seconds(1));
        }

        assert_eq!(cache.len(), 2);
        assert!(cache.fresh(&cache_key("BTC", &window)).is_none());
        assert!(cache.fresh(&cache_key("SOL", &window)).is_some());
    }

    /// Labels every item bullish with a fixed confidence
    struct FixedConfidence(f64);

    #[async_trait]
    impl Classifier for FixedConfidence {
        async fn classify(&self, _coin: &str, items: &[NewsItem]) -> Result<Vec<SentimentLabel>, ClassifyError> {
            Ok(items
                .iter()
                .map(|it| SentimentLabel {
                    ts: it.pub_date.timestamp_millis(),
                    sentiment: Sentiment::Bullish,
                    confidence: self.0,
                    reason: String::new(),
                    is_price_news: false,
                    timeframe: Some("short_term".to_string()),
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_out_of_range_confidence_is_clamped() {
        let window = window_service::yesterday(now());
        for (raw, expected) in [(1.7, 1.0), (-0.3, 0.0), (f64::NAN, 0.5)] {
            let clock = Arc::new(ManualClock::at(now()));
            let cache = SentimentCache::new(Arc::new(FixedConfidence(raw)), clock, Duration::minutes(5), 4);
            let points = cache.get("BTC", &window, || async { items() }).await;
            assert_eq!(points.len(), 2);
            for p in &points {
                assert_eq!(p.confidence, expected, "raw confidence {}", raw);
            }
        }
    }

    #[test]
    fn test_items_sharing_a_timestamp_share_the_label() {
        let mut same_minute = items();
        same_minute[1].pub_date = same_minute[0].pub_date;
        let labels = vec![SentimentLabel {
            ts: same_minute[0].pub_date.timestamp_millis(),
            sentiment: Sentiment::Bullish,
            confidence: 0.9,
            reason: "flows".to_string(),
            is_price_news: true,
            timeframe: None,
        }];

        let points = join_labels(&same_minute, labels);

        assert_eq!(points.len(), 2);
        for p in &points {
            assert_eq!(p.sentiment, Sentiment::Bullish);
            assert_eq!(p.confidence, 0.9);
            assert_eq!(p.reason, "flows");
        }
    }

    #[test]
    fn test_cache_key_shape() {
        let window = window_service::yesterday(now());
        assert_eq!(
            cache_key("BTC", &window),
            "BTC:yesterday:2024-03-14T00:00:00.000Z:2024-03-14T23:59:59.999Z"
        );
    }
}
