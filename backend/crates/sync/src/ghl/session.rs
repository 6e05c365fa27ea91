use salesops_common::error::SalesOpsError;
use salesops_db::accounts::models::Account;
use salesops_db::accounts::repositories::{AccountRepository, CredentialRepository};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};
use crate::token::{TokenExchanger, TokenManager};

/// Everything a GHL job needs to talk to one account's location.
#[derive(Debug, Clone)]
pub struct GhlSession {
    pub account: Account,
    pub location_id: String,
    pub access_token: String,
}

impl GhlSession {
    pub fn account_id(&self) -> Uuid {
        self.account.id
    }

    pub fn timezone(&self) -> Option<&str> {
        self.account.timezone.as_deref()
    }
}

/// Load the account and a valid GHL token for it.
pub async fn resolve_session<A, R, E>(
    accounts: &A,
    tokens: &TokenManager<R, E>,
    account_id: Uuid,
) -> SyncResult<GhlSession>
where
    A: AccountRepository + ?Sized,
    R: CredentialRepository,
    E: TokenExchanger,
{
    let account = accounts
        .get_by_id(account_id)
        .await?
        .ok_or_else(|| SalesOpsError::NotFound(format!("account {account_id}")))?;

    let location_id = account
        .ghl_location_id
        .clone()
        .filter(|l| !l.is_empty())
        .ok_or_else(|| SyncError::Auth(format!("account {account_id} has no GHL location")))?;

    let access_token = tokens
        .access_token_for(account_id)
        .await?
        .ok_or_else(|| SyncError::Auth(format!("account {account_id} is not connected to GHL")))?;

    Ok(GhlSession {
        account,
        location_id,
        access_token,
    })
}
