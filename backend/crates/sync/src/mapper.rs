//! Pure mapping from provider records to local rows.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use salesops_db::appointments::models::{AppointmentRow, EnrichmentData};
use salesops_db::contacts::models::ContactRow;
use salesops_db::dials::models::DialRow;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};
use crate::ghl::models::{GhlCallMessage, GhlContact, GhlEvent};

/// Full name if present, otherwise `first last`. Blank results are `None`.
pub fn display_name(full: Option<&str>, first: Option<&str>, last: Option<&str>) -> Option<String> {
    if let Some(full) = full.map(str::trim).filter(|s| !s.is_empty()) {
        return Some(full.to_string());
    }
    let joined = format!("{} {}", first.unwrap_or("").trim(), last.unwrap_or("").trim());
    let joined = joined.trim();
    if joined.is_empty() {
        None
    } else {
        Some(joined.to_string())
    }
}

/// First parseable IANA zone among the record's and the tenant's, else UTC.
pub fn resolve_timezone(record_tz: Option<&str>, tenant_tz: Option<&str>) -> Tz {
    [record_tz, tenant_tz]
        .into_iter()
        .flatten()
        .find_map(|name| name.trim().parse::<Tz>().ok())
        .unwrap_or(Tz::UTC)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocalBuckets {
    pub date: NaiveDate,
    /// Monday on or before `date`.
    pub week_start: NaiveDate,
    pub month_start: NaiveDate,
}

pub fn local_buckets(ts: DateTime<Utc>, tz: Tz) -> LocalBuckets {
    let date = ts.with_timezone(&tz).date_naive();
    let week_start = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
    let month_start = date.with_day(1).unwrap_or(date);
    LocalBuckets {
        date,
        week_start,
        month_start,
    }
}

fn bucket_fields(
    ts: Option<DateTime<Utc>>,
    tz: Tz,
) -> (Option<NaiveDate>, Option<NaiveDate>, Option<NaiveDate>) {
    match ts.map(|t| local_buckets(t, tz)) {
        Some(b) => (Some(b.date), Some(b.week_start), Some(b.month_start)),
        None => (None, None, None),
    }
}

fn decode<T: DeserializeOwned>(kind: &str, record: &serde_json::Value) -> SyncResult<T> {
    serde_json::from_value(record.clone()).map_err(|e| {
        let id = record.get("id").and_then(|v| v.as_str()).unwrap_or("?");
        SyncError::Decode(format!("{kind} {id}: {e}"))
    })
}

pub fn map_contact(
    account_id: Uuid,
    tenant_tz: Option<&str>,
    record: &serde_json::Value,
) -> SyncResult<ContactRow> {
    let c: GhlContact = decode("contact", record)?;
    let tz = resolve_timezone(c.timezone.as_deref(), tenant_tz);
    let (local_date, local_week, local_month) = bucket_fields(c.date_added, tz);

    Ok(ContactRow {
        id: Uuid::new_v4(),
        account_id,
        external_id: c.id,
        name: display_name(
            c.contact_name.as_deref(),
            c.first_name.as_deref(),
            c.last_name.as_deref(),
        ),
        first_name: c.first_name,
        last_name: c.last_name,
        email: c.email,
        phone: c.phone,
        source: c.source,
        timezone: c.timezone,
        tags: c.tags,
        custom_fields: c.custom_fields,
        attribution: c.attribution_source.unwrap_or(serde_json::Value::Null),
        date_added: c.date_added,
        local_date,
        local_week,
        local_month,
    })
}

/// Map a calendar event. Contact and user enrichments are added by the caller.
pub fn map_appointment(
    account_id: Uuid,
    tenant_tz: Option<&str>,
    record: &serde_json::Value,
) -> SyncResult<AppointmentRow> {
    let e: GhlEvent = decode("event", record)?;
    let tz = resolve_timezone(None, tenant_tz);
    let (local_date, local_week, local_month) = bucket_fields(e.start_time, tz);

    let mut enrichments = vec![EnrichmentData::AppointmentApi {
        calendar_id: e.calendar_id.clone(),
        status: e.appointment_status.clone(),
        raw: record.clone(),
    }];
    if let Some(created_by) = &e.created_by {
        if created_by.user_id.is_some() {
            enrichments.push(EnrichmentData::Setter {
                user_id: created_by.user_id.clone(),
                name: None,
            });
        }
    }

    Ok(AppointmentRow {
        id: Uuid::new_v4(),
        account_id,
        external_id: e.id,
        calendar_id: e.calendar_id,
        contact_external_id: e.contact_id,
        contact_id: None,
        title: e.title,
        status: e.appointment_status,
        assigned_user_id: e.assigned_user_id,
        start_time: e.start_time,
        end_time: e.end_time,
        local_date,
        local_week,
        local_month,
        enrichments,
    })
}

pub fn map_dial(
    account_id: Uuid,
    tenant_tz: Option<&str>,
    record: &serde_json::Value,
) -> SyncResult<DialRow> {
    let m: GhlCallMessage = decode("call", record)?;
    let tz = resolve_timezone(None, tenant_tz);
    let (local_date, local_week, local_month) = bucket_fields(m.date_added, tz);
    let call = m.meta.and_then(|meta| meta.call);

    Ok(DialRow {
        id: Uuid::new_v4(),
        account_id,
        external_id: m.id,
        contact_external_id: m.contact_id,
        direction: m.direction,
        status: call
            .as_ref()
            .and_then(|c| c.status.clone())
            .or(m.status),
        duration_secs: call.and_then(|c| c.duration),
        user_external_id: m.user_id,
        called_at: m.date_added,
        local_date,
        local_week,
        local_month,
    })
}
