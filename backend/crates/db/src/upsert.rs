use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use salesops_common::error::SalesOpsResult;

/// A locally persisted row mirroring a provider record.
///
/// `(account_id, external_id)` is the natural key every upsert conflicts on.
pub trait ExternalRow {
    fn account_id(&self) -> Uuid;
    fn external_id(&self) -> &str;
}

/// Multi-row insert-or-overwrite keyed on `(account_id, external_id)`.
#[async_trait]
pub trait BatchUpsert<R: Sync>: Send + Sync {
    /// Write all rows in a single statement. Returns the number of rows
    /// inserted or updated.
    async fn upsert_batch(&self, rows: &[R]) -> SalesOpsResult<usize>;
}

/// Collapse rows sharing a key so a single statement never touches the same
/// row twice. The last occurrence wins and keeps its position.
pub fn dedupe_last_wins<R: ExternalRow + Clone>(rows: &[R]) -> Vec<R> {
    let mut last_index: HashMap<(Uuid, &str), usize> = HashMap::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        last_index.insert((row.account_id(), row.external_id()), i);
    }

    rows.iter()
        .enumerate()
        .filter(|(i, row)| last_index.get(&(row.account_id(), row.external_id())) == Some(i))
        .map(|(_, row)| row.clone())
        .collect()
}
