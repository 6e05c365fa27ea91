use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use salesops_db::contacts::repositories::ContactRepository;
use salesops_db::sync::models::SyncCheckpoint;
use salesops_db::sync::repositories::SyncCheckpointRepository;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};
use crate::ghl::{GhlClient, GhlSession};
use crate::mapper::map_contact;
use crate::paginate::{PageCursor, PageSource, Paginator, SourcePage};
use crate::progress::{ProgressSink, ProgressTracker};
use crate::upsert::{BatchUpserter, DEFAULT_BATCH_SIZE};

pub const CONTACTS_JOB: &str = "ghl_contacts";
/// A `running` checkpoint not touched for this long is considered abandoned.
pub const LEASE_STALE_AFTER_MINUTES: i64 = 15;

#[derive(Debug, Clone, Default)]
pub struct ContactSyncOptions {
    /// Only contacts updated at or after this instant.
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSyncSummary {
    pub total_fetched: u64,
    pub inserted_or_updated: u64,
    pub errors: u64,
    pub resumed: bool,
}

/// Contact search as a page source. Pages continue from the last
/// contact's `searchAfter` key.
struct ContactSearchSource<'a> {
    client: &'a GhlClient,
    session: &'a GhlSession,
    since: Option<DateTime<Utc>>,
}

#[async_trait]
impl PageSource for ContactSearchSource<'_> {
    type Item = serde_json::Value;

    async fn fetch(
        &self,
        cursor: &PageCursor,
        limit: usize,
    ) -> SyncResult<SourcePage<serde_json::Value>> {
        let response = self
            .client
            .search_contacts(
                &self.session.access_token,
                &self.session.location_id,
                limit,
                cursor.search_after.as_ref(),
                self.since,
            )
            .await?;

        let len = response.contacts.len();
        let search_after = response
            .contacts
            .last()
            .and_then(|c| c.get("searchAfter"))
            .filter(|v| !v.is_null())
            .cloned();

        let (has_more, next_cursor) = match search_after {
            Some(after) => (
                None,
                Some(PageCursor {
                    page: cursor.page + 1,
                    offset: cursor.offset + len,
                    search_after: Some(after),
                }),
            ),
            None if len > 0 => {
                tracing::warn!(
                    account_id = %self.session.account_id(),
                    "contact page carries no searchAfter key, stopping walk"
                );
                (Some(false), None)
            }
            None => (None, None),
        };

        Ok(SourcePage {
            items: response.contacts,
            has_more,
            next_cursor,
            total: response.total,
        })
    }
}

pub struct ContactSyncer<C, K> {
    client: GhlClient,
    contacts: C,
    checkpoints: K,
    page_size: usize,
    page_delay: StdDuration,
    batch_size: usize,
}

impl<C, K> ContactSyncer<C, K>
where
    C: ContactRepository,
    K: SyncCheckpointRepository,
{
    pub fn new(client: GhlClient, contacts: C, checkpoints: K) -> Self {
        let page_size = client.config().page_size;
        let page_delay = client.config().page_delay();
        Self {
            client,
            contacts,
            checkpoints,
            page_size,
            page_delay,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Pull contacts for the session's location and upsert them page by page.
    ///
    /// Unless this is a dry run, the run holds the account's contact
    /// checkpoint: the cursor is saved after every committed page and a run
    /// that failed or was interrupted resumes from it.
    pub async fn sync(
        &self,
        session: &GhlSession,
        options: &ContactSyncOptions,
        progress: &dyn ProgressSink,
    ) -> SyncResult<ContactSyncSummary> {
        let account_id = session.account_id();
        let started_at = Utc::now();
        let mut tracker = ProgressTracker::start(progress, "starting contact sync");

        let checkpoint = if options.dry_run {
            None
        } else {
            match self.claim(account_id).await {
                Ok(cp) => Some(cp),
                Err(e) => {
                    tracker.fail(e.to_string());
                    return Err(e);
                }
            }
        };

        let start = checkpoint
            .as_ref()
            .and_then(|cp| cp.resume_cursor())
            .and_then(|raw| match serde_json::from_str::<PageCursor>(raw) {
                Ok(cursor) => Some(cursor),
                Err(e) => {
                    tracing::warn!(%account_id, error = %e, "unreadable checkpoint cursor, starting over");
                    None
                }
            });
        let resumed = start.is_some();
        if resumed {
            tracing::info!(%account_id, "resuming contact sync from checkpoint");
        }

        let outcome = self
            .run(
                session,
                options,
                start.unwrap_or_default(),
                checkpoint.as_ref(),
                &mut tracker,
            )
            .await;

        let reached_end = match outcome {
            Ok(reached_end) => reached_end,
            Err(e) => {
                self.fail_run(account_id, checkpoint.as_ref(), &e).await;
                tracker.fail(e.to_string());
                return Err(e);
            }
        };

        let counters = tracker.counters();
        if let Some(cp) = &checkpoint {
            let synced_through = (reached_end && covers_watermark(options.since, cp.last_synced_at))
                .then_some(started_at);
            if synced_through.is_none() {
                tracing::info!(%account_id, "partial contact sync, watermark left unchanged");
            }
            if let Err(e) = self
                .checkpoints
                .mark_completed(cp.id, counters.processed as i64, synced_through)
                .await
            {
                tracker.fail(e.to_string());
                return Err(e.into());
            }
        }

        let summary = ContactSyncSummary {
            total_fetched: counters.fetched,
            inserted_or_updated: counters.upserted,
            errors: counters.errors,
            resumed,
        };
        tracker.complete(format!(
            "synced {} contacts ({} errors)",
            summary.inserted_or_updated, summary.errors
        ));
        tracing::info!(%account_id, ?summary, dry_run = options.dry_run, "contact sync completed");
        Ok(summary)
    }

    async fn fail_run(&self, account_id: Uuid, checkpoint: Option<&SyncCheckpoint>, e: &SyncError) {
        if let Some(cp) = checkpoint {
            if let Err(mark_err) = self.checkpoints.mark_failed(cp.id, &e.to_string()).await {
                tracing::error!(%account_id, error = %mark_err, "failed to mark checkpoint failed");
            }
        }
        tracing::error!(%account_id, error = %e, "contact sync failed");
    }

    async fn claim(&self, account_id: Uuid) -> SyncResult<SyncCheckpoint> {
        self.checkpoints.get_or_create(account_id, CONTACTS_JOB).await?;
        self.checkpoints
            .acquire_lock(
                account_id,
                CONTACTS_JOB,
                Duration::minutes(LEASE_STALE_AFTER_MINUTES),
            )
            .await?
            .ok_or_else(|| {
                tracing::info!(%account_id, "contact sync already running, skipping");
                SyncError::AlreadyRunning(format!("contact sync for account {account_id}"))
            })
    }

    /// Walk and upsert. `Ok(true)` when the walk reached the end of the
    /// collection rather than stopping at `limit`.
    async fn run(
        &self,
        session: &GhlSession,
        options: &ContactSyncOptions,
        start: PageCursor,
        checkpoint: Option<&SyncCheckpoint>,
        tracker: &mut ProgressTracker<'_>,
    ) -> SyncResult<bool> {
        let account_id = session.account_id();
        let paginator =
            Paginator::new(self.page_size, self.page_delay).with_max_total(options.limit);
        let source = ContactSearchSource {
            client: &self.client,
            session,
            since: options.since,
        };
        let upserter = BatchUpserter::new(&self.contacts, self.batch_size, options.dry_run);
        let mut walk = paginator.walk(&source, start);

        loop {
            if tracker.is_cancelled() {
                tracing::info!(%account_id, "client went away, stopping contact sync");
                return Err(SyncError::Cancelled);
            }

            tracker.fetching("fetching contacts");
            let Some(page) = walk.next().await? else {
                break;
            };
            tracker.set_total_estimate(page.total);
            tracker.processing(format!("processing {} contacts", page.items.len()));

            let mut rows = Vec::with_capacity(page.items.len());
            let mut errors = 0;
            for record in &page.items {
                match map_contact(account_id, session.timezone(), record) {
                    Ok(row) => rows.push(row),
                    Err(e) => {
                        tracing::warn!(%account_id, error = %e, "skipping undecodable contact");
                        errors += 1;
                    }
                }
            }

            let upserted = upserter.write(&rows).await?;
            let count = page.items.len() as u64;
            tracker.record(count, count, upserted as u64, errors);

            if let (Some(cp), Some(next)) = (checkpoint, &page.next) {
                let raw =
                    serde_json::to_string(next).map_err(|e| SyncError::Decode(e.to_string()))?;
                self.checkpoints
                    .save_cursor(cp.id, &raw, tracker.counters().processed as i64)
                    .await?;
            }
        }

        Ok(!walk.truncated())
    }
}

/// A finished run moves the incremental watermark only if its `since` did
/// not skip anything the previous watermark had not covered.
fn covers_watermark(since: Option<DateTime<Utc>>, watermark: Option<DateTime<Utc>>) -> bool {
    match (since, watermark) {
        (None, _) => true,
        (Some(since), Some(watermark)) => since <= watermark,
        (Some(_), None) => false,
    }
}
