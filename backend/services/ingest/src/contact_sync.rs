use chrono::{DateTime, Utc};
use salesops_common::error::SalesOpsResult;
use salesops_common::types::Provider;
use salesops_db::accounts::repositories::{AccountRepository, CredentialRepository};
use salesops_db::contacts::repositories::ContactRepository;
use salesops_db::sync::repositories::SyncCheckpointRepository;
use salesops_sync::contacts::{
    ContactSyncOptions, ContactSyncSummary, ContactSyncer, CONTACTS_JOB,
};
use salesops_sync::ghl::resolve_session;
use salesops_sync::progress::NoProgress;
use salesops_sync::token::{TokenExchanger, TokenManager};
use salesops_sync::SyncResult;
use uuid::Uuid;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncRunReport {
    pub synced: usize,
    pub failed: usize,
}

/// Incremental contact sync over every GHL-connected account. A failing
/// account is logged and skipped.
pub async fn sync_connected_accounts<A, R, E, C, K>(
    accounts: &A,
    tokens: &TokenManager<R, E>,
    syncer: &ContactSyncer<C, K>,
    checkpoints: &K,
) -> SalesOpsResult<SyncRunReport>
where
    A: AccountRepository,
    R: CredentialRepository,
    E: TokenExchanger,
    C: ContactRepository,
    K: SyncCheckpointRepository,
{
    let connected = accounts.list_connected(Provider::Ghl).await?;
    tracing::info!(accounts = connected.len(), "starting ghl contact sync");

    let mut report = SyncRunReport::default();
    for account in connected {
        let account_id = account.id;
        match sync_account(accounts, tokens, syncer, checkpoints, account_id).await {
            Ok(summary) => {
                report.synced += 1;
                tracing::info!(
                    %account_id,
                    fetched = summary.total_fetched,
                    upserted = summary.inserted_or_updated,
                    errors = summary.errors,
                    resumed = summary.resumed,
                    "ghl contact sync completed"
                );
            }
            Err(e) => {
                report.failed += 1;
                tracing::error!(%account_id, error = %e, "ghl contact sync failed");
            }
        }
    }
    Ok(report)
}

/// Sync one account, picking up from its last completed run.
pub async fn sync_account<A, R, E, C, K>(
    accounts: &A,
    tokens: &TokenManager<R, E>,
    syncer: &ContactSyncer<C, K>,
    checkpoints: &K,
    account_id: Uuid,
) -> SyncResult<ContactSyncSummary>
where
    A: AccountRepository,
    R: CredentialRepository,
    E: TokenExchanger,
    C: ContactRepository,
    K: SyncCheckpointRepository,
{
    let session = resolve_session(accounts, tokens, account_id).await?;
    let options = ContactSyncOptions {
        since: last_synced_at(checkpoints, account_id).await?,
        ..Default::default()
    };
    syncer.sync(&session, &options, &NoProgress).await
}

async fn last_synced_at<K: SyncCheckpointRepository>(
    checkpoints: &K,
    account_id: Uuid,
) -> SyncResult<Option<DateTime<Utc>>> {
    let checkpoint = checkpoints.get_or_create(account_id, CONTACTS_JOB).await?;
    Ok(checkpoint.last_synced_at)
}
