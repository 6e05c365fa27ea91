use async_trait::async_trait;
use salesops_common::error::SalesOpsResult;
use uuid::Uuid;

use crate::contacts::models::ContactRow;
use crate::upsert::BatchUpsert;

#[async_trait]
pub trait ContactRepository: BatchUpsert<ContactRow> {
    async fn get_by_external_id(
        &self,
        account_id: Uuid,
        external_id: &str,
    ) -> SalesOpsResult<Option<ContactRow>>;
}
