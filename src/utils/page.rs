//! Pagination as an explicit state machine.
//!
//! A `PagePolicy` decides, page by page, what to keep and whether to continue;
//! `paginate` drives any `PageSource` with it. Every cursor style (page number,
//! continuation token, timestamp) goes through the same loop.

use std::fmt::Debug;

use tracing::{debug, warn};

use crate::api::provider::{PageScope, PageSource, RawPage};
use crate::models::news::{sort_newest_first, NewsItem};

/// Why a paginated fetch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Upstream returned no items
    EmptyPage,
    /// Enough items were collected
    VolumeReached,
    /// Items crossed the window's lower bound
    PastLowerBound,
    /// No continuation token to follow
    CursorExhausted,
    /// Page budget spent
    PageLimit,
    /// A page request failed after retries
    FetchFailed,
    /// Items grew older than the lookback horizon
    AgeLimit,
}

/// Outcome of absorbing one page
#[derive(Debug, Clone, PartialEq)]
pub enum Transition<C> {
    Next(C),
    Stop(StopReason),
}

#[derive(Debug)]
pub enum PageState<C> {
    Fetching(C),
    Filtering { cursor: C, page: RawPage },
    Done(StopReason),
}

pub trait PagePolicy: Send + Sync {
    type Cursor: Clone + Debug + Send + Sync;

    fn start(&self) -> Self::Cursor;

    fn max_pages(&self) -> usize;

    /// Keep what belongs from `page` in `acc` and pick the next transition
    fn absorb(&self, cursor: &Self::Cursor, page: RawPage, acc: &mut Vec<NewsItem>) -> Transition<Self::Cursor>;
}

/// Result of a paginated fetch, newest first
#[derive(Debug, Clone)]
pub struct Paged {
    pub items: Vec<NewsItem>,
    pub pages: usize,
    pub stop: StopReason,
}

/// Drive `source` with `policy` until the policy stops or the budget runs out
///
/// A failing page ends the walk but keeps whatever was gathered before it.
pub async fn paginate<P, S>(policy: &P, source: &S, scope: &PageScope) -> Paged
where
    P: PagePolicy,
    S: PageSource<P::Cursor> + ?Sized,
{
    let mut items = Vec::new();
    let mut pages = 0;
    let mut state = PageState::Fetching(policy.start());

    loop {
        state = match state {
            PageState::Fetching(_) if pages >= policy.max_pages() => PageState::Done(StopReason::PageLimit),
            PageState::Fetching(cursor) => match source.fetch_page(scope, &cursor).await {
                Ok(page) => {
                    pages += 1;
                    debug!("Page {} at {:?}: {} items", pages, cursor, page.items.len());
                    PageState::Filtering { cursor, page }
                }
                Err(e) => {
                    warn!("Page fetch at {:?} failed, keeping {} items: {}", cursor, items.len(), e);
                    PageState::Done(StopReason::FetchFailed)
                }
            },
            PageState::Filtering { cursor, page } => match policy.absorb(&cursor, page, &mut items) {
                Transition::Next(next) => PageState::Fetching(next),
                Transition::Stop(reason) => PageState::Done(reason),
            },
            PageState::Done(stop) => {
                sort_newest_first(&mut items);
                debug!("Pagination stopped ({:?}) after {} pages with {} items", stop, pages, items.len());
                return Paged { items, pages, stop };
            }
        };
    }
}
