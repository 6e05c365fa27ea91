use chrono::{DateTime, Utc};
use salesops_common::error::SalesOpsError;
use salesops_sync::contacts::ContactSyncOptions;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncContactsRequest {
    pub account_id: Uuid,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub dry_run: bool,
}

impl SyncContactsRequest {
    pub fn options(&self) -> Result<ContactSyncOptions, SalesOpsError> {
        if self.limit == Some(0) {
            return Err(SalesOpsError::Validation(
                "limit must be positive".to_string(),
            ));
        }
        Ok(ContactSyncOptions {
            since: self.since,
            limit: self.limit,
            dry_run: self.dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_with_defaults() {
        let req: SyncContactsRequest = serde_json::from_value(serde_json::json!({
            "accountId": "6f1c1f8e-3b44-4a55-9a4c-1f1f3c7d2a10",
            "since": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        let options = req.options().unwrap();
        assert!(!options.dry_run);
        assert!(options.limit.is_none());
        assert!(options.since.is_some());
    }

    #[test]
    fn zero_limit_is_rejected() {
        let req: SyncContactsRequest = serde_json::from_value(serde_json::json!({
            "accountId": "6f1c1f8e-3b44-4a55-9a4c-1f1f3c7d2a10",
            "limit": 0,
            "dryRun": true
        }))
        .unwrap();
        assert!(matches!(req.options(), Err(SalesOpsError::Validation(_))));
    }
}
