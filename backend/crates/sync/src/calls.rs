use std::time::Duration;

use async_trait::async_trait;
use salesops_db::dials::repositories::DialRepository;
use serde::Serialize;

use crate::error::SyncResult;
use crate::ghl::{GhlClient, GhlSession};
use crate::mapper::map_dial;
use crate::paginate::{PageCursor, PageSource, Paginator, SourcePage};
use crate::upsert::BatchUpserter;

pub const DEFAULT_CALL_BATCH: usize = 100;

#[derive(Debug, Clone)]
pub struct CallBackfillOptions {
    pub offset: usize,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallBackfillSummary {
    pub processed: usize,
    pub upserted: usize,
    pub errors: usize,
    pub next_offset: Option<usize>,
    pub has_more: bool,
}

struct CallExportSource<'a> {
    client: &'a GhlClient,
    session: &'a GhlSession,
}

#[async_trait]
impl PageSource for CallExportSource<'_> {
    type Item = serde_json::Value;

    async fn fetch(
        &self,
        cursor: &PageCursor,
        limit: usize,
    ) -> SyncResult<SourcePage<serde_json::Value>> {
        let response = self
            .client
            .export_call_messages(
                &self.session.access_token,
                &self.session.location_id,
                cursor.offset,
                limit,
            )
            .await?;
        let len = response.messages.len();
        let has_more = response
            .total
            .map(|total| ((cursor.offset + len) as u64) < total);

        Ok(SourcePage {
            items: response.messages,
            has_more,
            next_cursor: None,
            total: response.total,
        })
    }
}

/// Imports call messages one bounded page per invocation; the caller
/// re-invokes with `next_offset` until `has_more` is false.
pub struct CallBackfiller<D> {
    client: GhlClient,
    dials: D,
}

impl<D: DialRepository> CallBackfiller<D> {
    pub fn new(client: GhlClient, dials: D) -> Self {
        Self { client, dials }
    }

    pub async fn backfill(
        &self,
        session: &GhlSession,
        options: &CallBackfillOptions,
    ) -> SyncResult<CallBackfillSummary> {
        let account_id = session.account_id();
        let batch_size = options.batch_size.max(1);
        let paginator = Paginator::new(batch_size, Duration::ZERO).with_max_total(Some(batch_size));
        let source = CallExportSource {
            client: &self.client,
            session,
        };

        let mut walk = paginator.walk(&source, PageCursor::at_offset(options.offset));
        let Some(page) = walk.next().await? else {
            tracing::info!(%account_id, offset = options.offset, "no calls left to backfill");
            return Ok(CallBackfillSummary::default());
        };

        let mut rows = Vec::with_capacity(page.items.len());
        let mut errors = 0;
        for record in &page.items {
            match map_dial(account_id, session.timezone(), record) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    tracing::warn!(%account_id, error = %e, "skipping undecodable call");
                    errors += 1;
                }
            }
        }

        let upserted = BatchUpserter::new(&self.dials, batch_size, false)
            .write(&rows)
            .await?;

        let processed = page.items.len();
        // `page.next` is cut by the cap, so ask the endpoint's own totals.
        let has_more = match page.total {
            Some(total) => ((options.offset + processed) as u64) < total,
            None => processed >= batch_size,
        };
        let summary = CallBackfillSummary {
            processed,
            upserted,
            errors,
            next_offset: has_more.then_some(options.offset + processed),
            has_more,
        };
        tracing::info!(%account_id, ?summary, "call batch done");
        Ok(summary)
    }
}
