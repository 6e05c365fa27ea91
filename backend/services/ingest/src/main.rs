mod contact_sync;

use contact_sync::sync_connected_accounts;
use salesops_common::types::Provider;
use salesops_config::{init_tracing, AppConfig};
use salesops_db::accounts::pg_repository::PgAccountRepository;
use salesops_db::accounts::repositories::AccountRepository;
use salesops_db::contacts::pg_repository::PgContactRepository;
use salesops_db::sync::pg_repository::PgSyncCheckpointRepository;
use salesops_sync::contacts::ContactSyncer;
use salesops_sync::ghl::{GhlClient, GhlClientConfig, GhlTokenExchanger};
use salesops_sync::meta::{MetaClientConfig, MetaTokenExchanger};
use salesops_sync::token::TokenManager;
use sqlx::PgPool;

#[tokio::main]
async fn main() {
    let config = AppConfig::from_env().expect("failed to load config");
    init_tracing(&config.log_level);

    tracing::info!(service = "salesops-ingest", "starting");

    let pool = salesops_db::create_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("failed to connect to database");

    sync_ghl_contacts(&pool).await;

    // Meta connector (optional, only runs if META_APP_ID/META_APP_SECRET are set)
    match MetaClientConfig::from_env() {
        Some(meta_config) => refresh_meta_tokens(&pool, meta_config).await,
        None => tracing::info!("no meta app credentials found, skipping token refresh"),
    }

    tracing::info!("ingest run finished");
}

/// Incremental contact sync for every account with GHL credentials.
async fn sync_ghl_contacts(pool: &PgPool) {
    let ghl_config = GhlClientConfig::from_env();
    let client = GhlClient::new(ghl_config.clone()).expect("failed to create ghl client");
    let accounts = PgAccountRepository::new(pool.clone());
    let checkpoints = PgSyncCheckpointRepository::new(pool.clone());
    let tokens = TokenManager::new(
        accounts.clone(),
        GhlTokenExchanger::new(&ghl_config).expect("failed to create ghl token client"),
    );
    let syncer = ContactSyncer::new(
        client,
        PgContactRepository::new(pool.clone()),
        checkpoints.clone(),
    );

    match sync_connected_accounts(&accounts, &tokens, &syncer, &checkpoints).await {
        Ok(report) => tracing::info!(
            synced = report.synced,
            failed = report.failed,
            "ghl contact sync finished"
        ),
        Err(e) => tracing::error!(error = %e, "failed to list ghl accounts"),
    }
}

/// Exchange Meta tokens nearing expiry for fresh long-lived ones.
async fn refresh_meta_tokens(pool: &PgPool, meta_config: MetaClientConfig) {
    let accounts = PgAccountRepository::new(pool.clone());
    let tokens = TokenManager::new(
        accounts.clone(),
        MetaTokenExchanger::new(meta_config).expect("failed to create meta token client"),
    );

    let connected = match accounts.list_connected(Provider::Meta).await {
        Ok(list) => list,
        Err(e) => {
            tracing::error!(error = %e, "failed to list meta accounts");
            return;
        }
    };
    tracing::info!(accounts = connected.len(), "checking meta tokens");

    for account in connected {
        match tokens.access_token_for(account.id).await {
            Ok(Some(_)) => tracing::debug!(account_id = %account.id, "meta token valid"),
            Ok(None) => tracing::warn!(account_id = %account.id, "no usable meta token"),
            Err(e) => {
                tracing::error!(account_id = %account.id, error = %e, "meta token check failed")
            }
        }
    }
}
