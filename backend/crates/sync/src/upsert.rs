use salesops_db::upsert::{dedupe_last_wins, BatchUpsert, ExternalRow};

use crate::error::SyncResult;

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Writes mapped rows in fixed-size chunks, one upsert statement per chunk.
pub struct BatchUpserter<'a, S: ?Sized> {
    sink: &'a S,
    batch_size: usize,
    dry_run: bool,
}

impl<'a, S: ?Sized> BatchUpserter<'a, S> {
    pub fn new(sink: &'a S, batch_size: usize, dry_run: bool) -> Self {
        Self {
            sink,
            batch_size: batch_size.max(1),
            dry_run,
        }
    }

    /// Upsert `rows`, returning how many were written.
    ///
    /// Duplicate keys collapse to their last occurrence. A failing chunk
    /// aborts the call; chunks written before it stay committed. Dry runs
    /// write nothing and return 0.
    pub async fn write<R>(&self, rows: &[R]) -> SyncResult<usize>
    where
        S: BatchUpsert<R>,
        R: ExternalRow + Clone + Sync,
    {
        if self.dry_run {
            tracing::debug!(rows = rows.len(), "dry run, skipping upsert");
            return Ok(0);
        }

        let rows = dedupe_last_wins(rows);
        let mut written = 0;
        for chunk in rows.chunks(self.batch_size) {
            written += self.sink.upsert_batch(chunk).await?;
        }
        Ok(written)
    }
}
