//! Per-page decisions for each news cursor style, plus the flat feed walk.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::api::provider::{FeedSource, RawPage};
use crate::models::news::sort_newest_first;
use crate::models::{Feed, NewsBatch, NewsItem, NewsQuery};
use crate::utils::page::{PagePolicy, StopReason, Transition};

/// Page budget for the page-number and continuation APIs
pub const DEEP_MAX_PAGES: usize = 6;
/// Smallest page size requested from the page-number and continuation APIs
pub const DEEP_MIN_PER_PAGE: usize = 50;

fn outside(item: &NewsItem, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> bool {
    from.is_some_and(|f| item.pub_date < f) || to.is_some_and(|t| item.pub_date > t)
}

/// `page=1,2,...` over a newest-first listing
///
/// The first item older than the window start ends the walk: every later
/// page is older still.
#[derive(Debug, Clone)]
pub struct PageNumberPolicy {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub per_page: usize,
    pub max_pages: usize,
}

impl PageNumberPolicy {
    pub fn for_query(query: &NewsQuery) -> Self {
        Self {
            from: query.from,
            to: query.to,
            per_page: query.per_feed.max(DEEP_MIN_PER_PAGE),
            max_pages: DEEP_MAX_PAGES,
        }
    }

    fn cap(&self) -> usize {
        self.per_page * self.max_pages
    }
}

impl PagePolicy for PageNumberPolicy {
    type Cursor = u32;

    fn start(&self) -> u32 {
        1
    }

    fn max_pages(&self) -> usize {
        self.max_pages
    }

    fn absorb(&self, page_no: &u32, page: RawPage, acc: &mut Vec<NewsItem>) -> Transition<u32> {
        if page.items.is_empty() {
            return Transition::Stop(StopReason::EmptyPage);
        }
        for item in page.items {
            if self.from.is_some_and(|from| item.pub_date < from) {
                return Transition::Stop(StopReason::PastLowerBound);
            }
            if self.to.is_some_and(|to| item.pub_date > to) {
                continue;
            }
            acc.push(item);
            if acc.len() >= self.cap() {
                return Transition::Stop(StopReason::VolumeReached);
            }
        }
        Transition::Next(page_no + 1)
    }
}

/// Opaque continuation token handed back by each page
#[derive(Debug, Clone)]
pub struct ContinuationPolicy {
    pub max_pages: usize,
}

impl Default for ContinuationPolicy {
    fn default() -> Self {
        Self { max_pages: DEEP_MAX_PAGES }
    }
}

impl PagePolicy for ContinuationPolicy {
    type Cursor = Option<String>;

    fn start(&self) -> Option<String> {
        None
    }

    fn max_pages(&self) -> usize {
        self.max_pages
    }

    fn absorb(&self, _cursor: &Option<String>, page: RawPage, acc: &mut Vec<NewsItem>) -> Transition<Option<String>> {
        if page.items.is_empty() {
            return Transition::Stop(StopReason::EmptyPage);
        }
        acc.extend(page.items);
        match page.continuation.filter(|c| !c.is_empty()) {
            Some(token) => Transition::Next(Some(token)),
            None => Transition::Stop(StopReason::CursorExhausted),
        }
    }
}

/// "Older than" timestamp cursor: next request starts one second before the
/// oldest item of the current page
#[derive(Debug, Clone)]
pub struct TimestampPolicy {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub since_hours: f64,
    pub now: DateTime<Utc>,
    pub per_page: usize,
    pub max_pages: usize,
}

impl TimestampPolicy {
    pub fn for_query(
        query: &NewsQuery,
        now: DateTime<Utc>,
        min_per_page: usize,
        max_pages: usize,
        default_since_hours: f64,
    ) -> Self {
        Self {
            from: query.from,
            to: query.to,
            since_hours: query.since_hours.unwrap_or(default_since_hours),
            now,
            per_page: min_per_page.max(query.per_feed * 5),
            max_pages,
        }
    }

    fn cap(&self) -> usize {
        self.per_page * self.max_pages
    }
}

impl PagePolicy for TimestampPolicy {
    type Cursor = Option<DateTime<Utc>>;

    fn start(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn max_pages(&self) -> usize {
        self.max_pages
    }

    fn absorb(
        &self,
        cursor: &Option<DateTime<Utc>>,
        page: RawPage,
        acc: &mut Vec<NewsItem>,
    ) -> Transition<Option<DateTime<Utc>>> {
        let Some(oldest) = page.items.iter().map(|i| i.pub_date).min() else {
            return Transition::Stop(StopReason::EmptyPage);
        };

        for item in page.items {
            if outside(&item, self.from, self.to) {
                continue;
            }
            acc.push(item);
            if acc.len() >= self.cap() {
                return Transition::Stop(StopReason::VolumeReached);
            }
        }

        let next = oldest - Duration::seconds(1);
        if cursor.is_some_and(|c| next >= c) {
            return Transition::Stop(StopReason::CursorExhausted);
        }
        if self.from.is_some_and(|from| next < from) {
            return Transition::Stop(StopReason::PastLowerBound);
        }
        if self.from.is_none() {
            let age_hours = (self.now - next).num_milliseconds() as f64 / 3_600_000.0;
            if age_hours > self.since_hours {
                return Transition::Stop(StopReason::AgeLimit);
            }
        }
        Transition::Next(Some(next))
    }
}

/// Fetch every feed in full, filter, sort and cap each one
///
/// A failing feed is skipped and reported in `skipped_sources`.
pub async fn fetch_flat(
    source: &dyn FeedSource,
    feeds: &[Feed],
    query: &NewsQuery,
    now: DateTime<Utc>,
    default_since_hours: f64,
) -> NewsBatch {
    let mut batch = NewsBatch::default();
    for feed in feeds {
        match source.fetch_feed(feed).await {
            Ok(items) => {
                let mut kept: Vec<NewsItem> = items
                    .into_iter()
                    .filter(|it| query.admits(it, now, default_since_hours))
                    .collect();
                sort_newest_first(&mut kept);
                kept.truncate(query.per_feed);
                debug!("{}: kept {} items", feed.source, kept.len());
                batch.items.extend(kept);
            }
            Err(e) => {
                warn!("Skipping feed {} ({}): {}", feed.source, feed.url, e);
                batch.skipped_sources.push(feed.source.clone());
            }
        }
    }
    sort_newest_first(&mut batch.items);
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fetcher::ApiError;
    use crate::api::provider::{PageScope, PageSource};
    use crate::utils::page::paginate;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn item(title: &str, pub_date: DateTime<Utc>) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            link: format!("https://example.com/{}", title),
            pub_date,
            source: "Test".to_string(),
        }
    }

    fn titles(items: &[NewsItem]) -> Vec<&str> {
        items.iter().map(|i| i.title.as_str()).collect()
    }

    struct NumberedPages {
        pages: HashMap<u32, Vec<NewsItem>>,
        requested: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl PageSource<u32> for NumberedPages {
        async fn fetch_page(&self, _scope: &PageScope, page: &u32) -> Result<RawPage, ApiError> {
            self.requested.lock().unwrap().push(*page);
            Ok(RawPage { items: self.pages.get(page).cloned().unwrap_or_default(), continuation: None })
        }
    }

    #[tokio::test]
    async fn test_page_number_stops_at_lower_bound() {
        // Window is March 14; page 1 starts after it, page 2 crosses its start
        let source = NumberedPages {
            pages: HashMap::from([
                (1, vec![item("late", at(15, 2)), item("a", at(14, 20)), item("b", at(14, 12))]),
                (2, vec![item("c", at(14, 6)), item("d", at(14, 0)), item("early", at(13, 22)), item("e", at(13, 10))]),
                (3, vec![item("f", at(13, 1))]),
            ]),
            requested: Mutex::new(Vec::new()),
        };
        let query = NewsQuery {
            from: Some(at(14, 0)),
            to: Some(at(14, 23)),
            ..NewsQuery::default()
        };
        let paged = paginate(&PageNumberPolicy::for_query(&query), &source, &PageScope::default()).await;

        assert_eq!(paged.stop, StopReason::PastLowerBound);
        assert_eq!(titles(&paged.items), vec!["a", "b", "c", "d"]);
        assert_eq!(*source.requested.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_page_number_volume_cap() {
        let policy = PageNumberPolicy { from: None, to: None, per_page: 1, max_pages: 2 };
        let mut acc = Vec::new();
        let page = RawPage {
            items: vec![item("a", at(14, 3)), item("b", at(14, 2)), item("c", at(14, 1))],
            continuation: None,
        };
        assert_eq!(policy.absorb(&1, page, &mut acc), Transition::Stop(StopReason::VolumeReached));
        assert_eq!(acc.len(), 2);
    }

    #[test]
    fn test_continuation_follows_token() {
        let policy = ContinuationPolicy::default();
        let mut acc = Vec::new();

        let with_token = RawPage { items: vec![item("a", at(14, 3))], continuation: Some("tok".to_string()) };
        assert_eq!(policy.absorb(&None, with_token, &mut acc), Transition::Next(Some("tok".to_string())));

        let last = RawPage { items: vec![item("b", at(14, 2))], continuation: None };
        assert_eq!(
            policy.absorb(&Some("tok".to_string()), last, &mut acc),
            Transition::Stop(StopReason::CursorExhausted)
        );

        assert_eq!(
            policy.absorb(&Some("x".to_string()), RawPage::default(), &mut acc),
            Transition::Stop(StopReason::EmptyPage)
        );
        assert_eq!(titles(&acc), vec!["a", "b"]);
    }

    fn timestamp_policy(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> TimestampPolicy {
        TimestampPolicy { from, to, since_hours: 24.0, now: at(15, 12), per_page: 50, max_pages: 4 }
    }

    #[test]
    fn test_timestamp_cursor_steps_before_oldest() {
        let policy = timestamp_policy(None, None);
        let mut acc = Vec::new();
        let page = RawPage { items: vec![item("a", at(15, 10)), item("b", at(15, 4))], continuation: None };

        assert_eq!(
            policy.absorb(&None, page, &mut acc),
            Transition::Next(Some(at(15, 4) - Duration::seconds(1)))
        );
        assert_eq!(acc.len(), 2);
    }

    #[test]
    fn test_timestamp_stops_past_lower_bound() {
        let policy = timestamp_policy(Some(at(14, 0)), Some(at(14, 23)));
        let mut acc = Vec::new();
        let page = RawPage {
            items: vec![item("late", at(15, 1)), item("in", at(14, 5)), item("old", at(13, 20))],
            continuation: None,
        };

        assert_eq!(policy.absorb(&None, page, &mut acc), Transition::Stop(StopReason::PastLowerBound));
        assert_eq!(titles(&acc), vec!["in"]);
    }

    #[test]
    fn test_timestamp_age_limit_without_window() {
        let policy = timestamp_policy(None, None);
        let mut acc = Vec::new();
        let page = RawPage { items: vec![item("old", at(14, 6))], continuation: None };
        assert_eq!(policy.absorb(&None, page, &mut acc), Transition::Stop(StopReason::AgeLimit));
    }

    #[test]
    fn test_timestamp_stalled_cursor() {
        let policy = timestamp_policy(None, None);
        let mut acc = Vec::new();
        let cursor = Some(at(15, 4) - Duration::seconds(1));
        let page = RawPage { items: vec![item("same", at(15, 4))], continuation: None };
        assert_eq!(policy.absorb(&cursor, page, &mut acc), Transition::Stop(StopReason::CursorExhausted));
    }

    struct Feeds;

    #[async_trait]
    impl FeedSource for Feeds {
        async fn fetch_feed(&self, feed: &Feed) -> Result<Vec<NewsItem>, ApiError> {
            match feed.source.as_str() {
                "Good" => Ok(vec![item("old", at(10, 0)), item("one", at(15, 9)), item("two", at(15, 11))]),
                _ => Err(ApiError::DeserializationError("not xml".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_flat_feed_skips_failures() {
        let feeds = vec![Feed::new("https://good/rss", "Good"), Feed::new("https://bad/rss", "Bad")];
        let query = NewsQuery { per_feed: 1, ..NewsQuery::default() };
        let batch = fetch_flat(&Feeds, &feeds, &query, at(15, 12), 72.0).await;

        assert_eq!(titles(&batch.items), vec!["two"]);
        assert_eq!(batch.skipped_sources, vec!["Bad".to_string()]);
    }
}
