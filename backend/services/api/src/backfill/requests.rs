use chrono::{DateTime, Utc};
use salesops_common::error::SalesOpsError;
use salesops_sync::appointments::{AppointmentBackfillOptions, DEFAULT_APPOINTMENT_BATCH};
use salesops_sync::calls::{CallBackfillOptions, DEFAULT_CALL_BATCH};
use serde::Deserialize;
use uuid::Uuid;

pub const MAX_BATCH_SIZE: usize = 500;

fn batch_size(requested: Option<usize>, default: usize) -> Result<usize, SalesOpsError> {
    match requested {
        None => Ok(default),
        Some(n) if (1..=MAX_BATCH_SIZE).contains(&n) => Ok(n),
        Some(n) => Err(SalesOpsError::Validation(format!(
            "batchSize must be between 1 and {MAX_BATCH_SIZE}, got {n}"
        ))),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillAppointmentsRequest {
    pub account_id: Uuid,
    pub start_iso: DateTime<Utc>,
    pub end_iso: DateTime<Utc>,
    #[serde(default)]
    pub offset: usize,
    pub batch_size: Option<usize>,
}

impl BackfillAppointmentsRequest {
    pub fn options(&self) -> Result<AppointmentBackfillOptions, SalesOpsError> {
        if self.end_iso <= self.start_iso {
            return Err(SalesOpsError::Validation(
                "endIso must be after startIso".to_string(),
            ));
        }
        Ok(AppointmentBackfillOptions {
            start: self.start_iso,
            end: self.end_iso,
            offset: self.offset,
            batch_size: batch_size(self.batch_size, DEFAULT_APPOINTMENT_BATCH)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillCallsRequest {
    pub account_id: Uuid,
    #[serde(default)]
    pub offset: usize,
    pub batch_size: Option<usize>,
}

impl BackfillCallsRequest {
    pub fn options(&self) -> Result<CallBackfillOptions, SalesOpsError> {
        Ok(CallBackfillOptions {
            offset: self.offset,
            batch_size: batch_size(self.batch_size, DEFAULT_CALL_BATCH)?,
        })
    }
}
