use async_trait::async_trait;
use salesops_common::error::SalesOpsResult;
use salesops_common::types::Provider;
use uuid::Uuid;

use crate::accounts::models::{Account, Credential, RefreshedToken};

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> SalesOpsResult<Option<Account>>;

    /// Accounts holding any credential for `provider`.
    async fn list_connected(&self, provider: Provider) -> SalesOpsResult<Vec<Account>>;
}

#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Returns `None` when the account does not exist.
    async fn get_credential(
        &self,
        account_id: Uuid,
        provider: Provider,
    ) -> SalesOpsResult<Option<Credential>>;

    /// Overwrite the stored token fields. Last write wins.
    async fn save_refreshed(
        &self,
        account_id: Uuid,
        provider: Provider,
        token: &RefreshedToken,
    ) -> SalesOpsResult<()>;
}
