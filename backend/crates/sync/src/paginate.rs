use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SyncResult;

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(100);

/// Position in a paginated collection. Which fields matter depends on the
/// endpoint: offset APIs read `offset`, search APIs read `search_after`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageCursor {
    pub page: u32,
    pub offset: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_after: Option<serde_json::Value>,
}

impl PageCursor {
    pub fn at_offset(offset: usize) -> Self {
        Self {
            offset,
            ..Self::default()
        }
    }

    /// Cursor for the page after one that returned `len` items.
    pub fn advance(&self, len: usize) -> Self {
        Self {
            page: self.page + 1,
            offset: self.offset + len,
            search_after: self.search_after.clone(),
        }
    }
}

/// One response from a collection endpoint.
#[derive(Debug)]
pub struct SourcePage<T> {
    pub items: Vec<T>,
    /// Explicit continuation flag, when the endpoint reports one.
    pub has_more: Option<bool>,
    pub next_cursor: Option<PageCursor>,
    /// Size of the whole collection, when the endpoint reports one.
    pub total: Option<u64>,
}

impl<T> SourcePage<T> {
    pub fn items(items: Vec<T>) -> Self {
        Self {
            items,
            has_more: None,
            next_cursor: None,
            total: None,
        }
    }
}

#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;

    async fn fetch(&self, cursor: &PageCursor, limit: usize) -> SyncResult<SourcePage<Self::Item>>;
}

/// A page handed to the caller.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor this page was fetched with.
    pub cursor: PageCursor,
    /// Cursor for the following page; `None` when the walk is over.
    pub next: Option<PageCursor>,
    pub total: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Paginator {
    page_size: usize,
    max_total: Option<usize>,
    delay: Duration,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_total: None,
            delay: DEFAULT_PAGE_DELAY,
        }
    }
}

impl Paginator {
    pub fn new(page_size: usize, delay: Duration) -> Self {
        Self {
            page_size: page_size.max(1),
            max_total: None,
            delay,
        }
    }

    pub fn with_max_total(mut self, max_total: Option<usize>) -> Self {
        self.max_total = max_total;
        self
    }

    pub fn walk<'a, S: PageSource>(&'a self, source: &'a S, start: PageCursor) -> Walk<'a, S> {
        Walk {
            paginator: self,
            source,
            cursor: Some(start),
            fetched: 0,
            requests: 0,
            truncated: false,
        }
    }

    /// Walk the whole collection from the start and collect every page.
    pub async fn fetch_all<S: PageSource>(&self, source: &S) -> SyncResult<Vec<Page<S::Item>>> {
        let mut walk = self.walk(source, PageCursor::default());
        let mut pages = Vec::new();
        while let Some(page) = walk.next().await? {
            pages.push(page);
        }
        Ok(pages)
    }
}

/// An in-progress walk. Each `next()` issues at most one request.
pub struct Walk<'a, S: PageSource> {
    paginator: &'a Paginator,
    source: &'a S,
    cursor: Option<PageCursor>,
    fetched: usize,
    requests: u32,
    truncated: bool,
}

impl<S: PageSource> Walk<'_, S> {
    pub fn fetched(&self) -> usize {
        self.fetched
    }

    /// True once `max_total` stopped the walk before the collection ran out.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub async fn next(&mut self) -> SyncResult<Option<Page<S::Item>>> {
        let Some(cursor) = self.cursor.take() else {
            return Ok(None);
        };

        let remaining = match self.paginator.max_total {
            Some(max) if self.fetched >= max => {
                self.truncated = true;
                return Ok(None);
            }
            Some(max) => Some(max - self.fetched),
            None => None,
        };

        if self.requests > 0 {
            tokio::time::sleep(self.paginator.delay).await;
        }
        self.requests += 1;

        let page_size = self.paginator.page_size;
        let response = self.source.fetch(&cursor, page_size).await?;
        let len = response.items.len();
        if len == 0 {
            tracing::debug!(page = cursor.page, "empty page, walk finished");
            return Ok(None);
        }

        let more = response.has_more.unwrap_or(len >= page_size);
        let mut next = if more {
            Some(
                response
                    .next_cursor
                    .unwrap_or_else(|| cursor.advance(len)),
            )
        } else {
            None
        };

        let mut items = response.items;
        if let Some(remaining) = remaining {
            if items.len() > remaining || (items.len() == remaining && next.is_some()) {
                items.truncate(remaining);
                next = None;
                self.truncated = true;
            }
        }

        self.fetched += items.len();
        self.cursor = next.clone();

        tracing::debug!(
            page = cursor.page,
            items = items.len(),
            fetched = self.fetched,
            more = next.is_some(),
            "fetched page"
        );

        Ok(Some(Page {
            items,
            cursor,
            next,
            total: response.total,
        }))
    }
}
