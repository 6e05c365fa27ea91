use std::str::FromStr;

use async_trait::async_trait;
use salesops_common::error::{SalesOpsError, SalesOpsResult};
use salesops_common::types::{AuthType, Provider};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::accounts::models::{Account, Credential, RefreshedToken};
use crate::accounts::repositories::{AccountRepository, CredentialRepository};

const ACCOUNT_COLUMNS: &str = "id, name, timezone, ghl_location_id, created_at, updated_at";

#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> Account {
        Account {
            id: row.get("id"),
            name: row.get("name"),
            timezone: row.get("timezone"),
            ghl_location_id: row.get("ghl_location_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    fn map_ghl_credential(row: PgRow) -> SalesOpsResult<Credential> {
        let auth_raw: Option<String> = row.get("ghl_auth_type");
        let auth_type = match auth_raw.as_deref() {
            Some(raw) => AuthType::from_str(raw).map_err(SalesOpsError::Internal)?,
            None => AuthType::OAuth,
        };

        let api_key: Option<String> = row.get("ghl_api_key");
        let access_token: Option<String> = row.get("ghl_access_token");

        Ok(Credential {
            subject_id: row.get("id"),
            provider: Provider::Ghl,
            auth_type,
            access_token: match auth_type {
                AuthType::ApiKey => api_key.or(access_token),
                AuthType::OAuth => access_token,
            },
            refresh_token: row.get("ghl_refresh_token"),
            expires_at: row.get("ghl_token_expires_at"),
        })
    }

    fn map_meta_credential(row: PgRow) -> Credential {
        Credential {
            subject_id: row.get("id"),
            provider: Provider::Meta,
            auth_type: AuthType::OAuth,
            access_token: row.get("meta_access_token"),
            refresh_token: None,
            expires_at: row.get("meta_token_expires_at"),
        }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn get_by_id(&self, id: Uuid) -> SalesOpsResult<Option<Account>> {
        let row = sqlx::query(&format!("select {ACCOUNT_COLUMNS} from accounts where id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SalesOpsError::Database(e.to_string()))?;

        Ok(row.map(Self::map_row))
    }

    async fn list_connected(&self, provider: Provider) -> SalesOpsResult<Vec<Account>> {
        let predicate = match provider {
            Provider::Ghl => {
                "ghl_location_id is not null
                 and (ghl_access_token is not null or ghl_refresh_token is not null or ghl_api_key is not null)"
            }
            Provider::Meta => "meta_access_token is not null",
        };

        let rows = sqlx::query(&format!(
            "select {ACCOUNT_COLUMNS} from accounts where {predicate} order by created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SalesOpsError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Self::map_row).collect())
    }
}

#[async_trait]
impl CredentialRepository for PgAccountRepository {
    async fn get_credential(
        &self,
        account_id: Uuid,
        provider: Provider,
    ) -> SalesOpsResult<Option<Credential>> {
        match provider {
            Provider::Ghl => {
                let row = sqlx::query(
                    "select id, ghl_auth_type, ghl_api_key, ghl_access_token,
                            ghl_refresh_token, ghl_token_expires_at
                     from accounts where id = $1",
                )
                .bind(account_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| SalesOpsError::Database(e.to_string()))?;

                row.map(Self::map_ghl_credential).transpose()
            }
            Provider::Meta => {
                let row = sqlx::query(
                    "select id, meta_access_token, meta_token_expires_at
                     from accounts where id = $1",
                )
                .bind(account_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| SalesOpsError::Database(e.to_string()))?;

                Ok(row.map(Self::map_meta_credential))
            }
        }
    }

    async fn save_refreshed(
        &self,
        account_id: Uuid,
        provider: Provider,
        token: &RefreshedToken,
    ) -> SalesOpsResult<()> {
        let result = match provider {
            Provider::Ghl => {
                sqlx::query(
                    "update accounts
                     set ghl_access_token = $1, ghl_refresh_token = $2,
                         ghl_token_expires_at = $3, updated_at = now()
                     where id = $4",
                )
                .bind(&token.access_token)
                .bind(&token.refresh_token)
                .bind(token.expires_at)
                .bind(account_id)
                .execute(&self.pool)
                .await
            }
            Provider::Meta => {
                sqlx::query(
                    "update accounts
                     set meta_access_token = $1, meta_token_expires_at = $2, updated_at = now()
                     where id = $3",
                )
                .bind(&token.access_token)
                .bind(token.expires_at)
                .bind(account_id)
                .execute(&self.pool)
                .await
            }
        }
        .map_err(|e| SalesOpsError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(SalesOpsError::NotFound(format!("account not found: {account_id}")));
        }

        tracing::debug!(%account_id, %provider, "stored refreshed credential");
        Ok(())
    }
}
