use std::collections::HashMap;

use chrono::{DateTime, Utc};
use salesops_db::appointments::models::{AppointmentRow, EnrichmentData};
use salesops_db::appointments::repositories::AppointmentRepository;
use salesops_db::contacts::repositories::ContactRepository;
use serde::Serialize;

use crate::error::{SyncError, SyncResult};
use crate::ghl::models::{GhlContact, GhlUser};
use crate::ghl::{GhlClient, GhlSession};
use crate::mapper::{display_name, map_appointment};
use crate::upsert::BatchUpserter;

pub const DEFAULT_APPOINTMENT_BATCH: usize = 25;

#[derive(Debug, Clone)]
pub struct AppointmentBackfillOptions {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub offset: usize,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentLogStatus {
    Created,
    Failed,
}

/// Outcome for one calendar event in a backfill batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentLog {
    pub event_id: String,
    pub status: AppointmentLogStatus,
    pub contact_id: Option<String>,
    pub message: Option<String>,
}

impl AppointmentLog {
    fn created(event_id: &str, contact_id: Option<&str>) -> Self {
        Self {
            event_id: event_id.to_string(),
            status: AppointmentLogStatus::Created,
            contact_id: contact_id.map(str::to_string),
            message: None,
        }
    }

    fn failed(event_id: &str, contact_id: Option<&str>, message: String) -> Self {
        Self {
            event_id: event_id.to_string(),
            status: AppointmentLogStatus::Failed,
            contact_id: contact_id.map(str::to_string),
            message: Some(message),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentBackfillSummary {
    pub total_events: usize,
    pub processed: usize,
    pub created: usize,
    pub failed: usize,
    pub next_offset: Option<usize>,
    pub has_more: bool,
    pub appointment_logs: Vec<AppointmentLog>,
}

/// Backfills calendar events in caller-driven slices of `[offset, offset + batch_size)`.
pub struct AppointmentBackfiller<C, A> {
    client: GhlClient,
    contacts: C,
    appointments: A,
}

impl<C, A> AppointmentBackfiller<C, A>
where
    C: ContactRepository,
    A: AppointmentRepository,
{
    pub fn new(client: GhlClient, contacts: C, appointments: A) -> Self {
        Self {
            client,
            contacts,
            appointments,
        }
    }

    pub async fn backfill(
        &self,
        session: &GhlSession,
        options: &AppointmentBackfillOptions,
    ) -> SyncResult<AppointmentBackfillSummary> {
        let account_id = session.account_id();
        let events = self.collect_events(session, options.start, options.end).await?;
        let total_events = events.len();
        let from = options.offset.min(total_events);
        let to = (from + options.batch_size.max(1)).min(total_events);
        let batch = &events[from..to];

        tracing::info!(
            %account_id,
            total_events,
            offset = from,
            batch = batch.len(),
            "backfilling appointments"
        );

        let mut users: HashMap<String, Option<GhlUser>> = HashMap::new();
        let mut rows = Vec::with_capacity(batch.len());
        let mut logs = Vec::with_capacity(batch.len());

        for record in batch {
            match self.build_row(session, record, &mut users).await {
                Ok(row) => {
                    logs.push(AppointmentLog::created(
                        &row.external_id,
                        row.contact_external_id.as_deref(),
                    ));
                    rows.push(row);
                }
                Err(log) => {
                    tracing::warn!(
                        %account_id,
                        event_id = %log.event_id,
                        reason = log.message.as_deref().unwrap_or(""),
                        "appointment skipped"
                    );
                    logs.push(log);
                }
            }
        }

        let created = BatchUpserter::new(&self.appointments, rows.len(), false)
            .write(&rows)
            .await?;
        let failed = logs
            .iter()
            .filter(|l| l.status == AppointmentLogStatus::Failed)
            .count();
        let has_more = to < total_events;

        let summary = AppointmentBackfillSummary {
            total_events,
            processed: batch.len(),
            created,
            failed,
            next_offset: has_more.then_some(to),
            has_more,
            appointment_logs: logs,
        };
        tracing::info!(
            %account_id,
            processed = summary.processed,
            created,
            failed,
            has_more,
            "appointment batch done"
        );
        Ok(summary)
    }

    /// All events in the window across the location's calendars, in a
    /// stable order so offsets mean the same thing on every call.
    async fn collect_events(
        &self,
        session: &GhlSession,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SyncResult<Vec<serde_json::Value>> {
        let calendars = self
            .client
            .list_calendars(&session.access_token, &session.location_id)
            .await?;

        let mut events = Vec::new();
        for calendar in &calendars {
            let mut page = self
                .client
                .list_calendar_events(
                    &session.access_token,
                    &session.location_id,
                    &calendar.id,
                    start,
                    end,
                )
                .await?;
            tracing::debug!(calendar_id = %calendar.id, events = page.len(), "listed calendar events");
            events.append(&mut page);
        }

        events.sort_by_key(|e| (str_field(e, "startTime"), str_field(e, "id")));
        Ok(events)
    }

    async fn build_row(
        &self,
        session: &GhlSession,
        record: &serde_json::Value,
        users: &mut HashMap<String, Option<GhlUser>>,
    ) -> Result<AppointmentRow, AppointmentLog> {
        let event_id = str_field(record, "id");
        let mut row = map_appointment(session.account_id(), session.timezone(), record)
            .map_err(|e| AppointmentLog::failed(&event_id, None, e.to_string()))?;

        if let Some(contact_ext) = row.contact_external_id.clone() {
            let contact = self
                .fetch_contact(session, &contact_ext)
                .await
                .map_err(|msg| AppointmentLog::failed(&event_id, Some(&contact_ext), msg))?;
            row.enrichments.push(EnrichmentData::ContactEnriched {
                name: display_name(
                    contact.contact_name.as_deref(),
                    contact.first_name.as_deref(),
                    contact.last_name.as_deref(),
                ),
                email: contact.email,
                phone: contact.phone,
                tags: contact.tags,
            });

            match self
                .contacts
                .get_by_external_id(session.account_id(), &contact_ext)
                .await
            {
                Ok(local) => row.contact_id = local.map(|c| c.id),
                Err(e) => tracing::warn!(
                    event_id = %event_id,
                    error = %e,
                    "could not link local contact"
                ),
            }
        }

        if let Some(user_id) = row.assigned_user_id.clone() {
            let user = self.lookup_user(session, &user_id, users).await;
            row.enrichments.push(EnrichmentData::SalesRep {
                name: user.as_ref().and_then(user_display_name),
                email: user.and_then(|u| u.email),
                user_id,
            });
        }

        for enrichment in row.enrichments.iter_mut() {
            if let EnrichmentData::Setter {
                user_id: Some(setter_id),
                name,
            } = enrichment
            {
                if name.is_none() {
                    let id = setter_id.clone();
                    *name = self
                        .lookup_user(session, &id, users)
                        .await
                        .as_ref()
                        .and_then(user_display_name);
                }
            }
        }

        Ok(row)
    }

    async fn fetch_contact(&self, session: &GhlSession, contact_id: &str) -> Result<GhlContact, String> {
        match self
            .client
            .get_contact(&session.access_token, contact_id)
            .await
        {
            Ok(Some(raw)) => serde_json::from_value(raw)
                .map_err(|e| format!("contact {contact_id} unreadable: {e}")),
            Ok(None) => Err(format!("contact {contact_id} not found")),
            Err(e) => Err(format!("contact lookup failed: {e}")),
        }
    }

    /// Cached per batch. Lookup errors are logged and not cached.
    async fn lookup_user(
        &self,
        session: &GhlSession,
        user_id: &str,
        cache: &mut HashMap<String, Option<GhlUser>>,
    ) -> Option<GhlUser> {
        if let Some(hit) = cache.get(user_id) {
            return hit.clone();
        }
        match self.client.get_user(&session.access_token, user_id).await {
            Ok(user) => {
                cache.insert(user_id.to_string(), user.clone());
                user
            }
            Err(SyncError::Http { status, .. }) if status.is_client_error() => {
                cache.insert(user_id.to_string(), None);
                None
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "user lookup failed");
                None
            }
        }
    }
}

fn str_field(record: &serde_json::Value, key: &str) -> String {
    record
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn user_display_name(user: &GhlUser) -> Option<String> {
    display_name(
        user.name.as_deref(),
        user.first_name.as_deref(),
        user.last_name.as_deref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::tests::MemoryContacts;
    use crate::ghl::client::tests::test_client;
    use crate::ghl::session::tests::test_session;
    use async_trait::async_trait;
    use salesops_common::error::SalesOpsResult;
    use salesops_db::contacts::models::ContactRow;
    use salesops_db::upsert::BatchUpsert;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Clone, Default)]
    struct MemoryAppointments {
        rows: Arc<Mutex<HashMap<String, AppointmentRow>>>,
    }

    #[async_trait]
    impl BatchUpsert<AppointmentRow> for MemoryAppointments {
        async fn upsert_batch(&self, rows: &[AppointmentRow]) -> SalesOpsResult<usize> {
            let mut table = self.rows.lock().unwrap();
            for row in rows {
                table.insert(row.external_id.clone(), row.clone());
            }
            Ok(rows.len())
        }
    }

    impl AppointmentRepository for MemoryAppointments {}

    fn event(id: &str, calendar: &str, start: &str, contact: Option<&str>) -> serde_json::Value {
        json!({
            "id": id,
            "calendarId": calendar,
            "contactId": contact,
            "title": format!("Call {id}"),
            "appointmentStatus": "confirmed",
            "assignedUserId": "u-rep",
            "startTime": start,
            "endTime": start
        })
    }

    async fn mount_calendars(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/calendars/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "calendars": [{ "id": "cal-a" }, { "id": "cal-b" }]
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/calendars/events"))
            .and(query_param("calendarId", "cal-a"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "events": [
                    event("evt-3", "cal-a", "2024-03-06T15:00:00Z", Some("c-1")),
                    event("evt-1", "cal-a", "2024-03-04T15:00:00Z", Some("c-1")),
                ]
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/calendars/events"))
            .and(query_param("calendarId", "cal-b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "events": [event("evt-2", "cal-b", "2024-03-05T15:00:00Z", Some("c-missing"))]
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/contacts/c-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "contact": {
                    "id": "c-1",
                    "firstName": "Ann",
                    "lastName": "Lee",
                    "email": "ann@example.com",
                    "tags": ["hot"]
                }
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/contacts/c-missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/u-rep"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u-rep",
                "name": "Rita Rep",
                "email": "rita@example.com"
            })))
            .mount(server)
            .await;
    }

    fn options(offset: usize, batch_size: usize) -> AppointmentBackfillOptions {
        AppointmentBackfillOptions {
            start: "2024-03-01T00:00:00Z".parse().unwrap(),
            end: "2024-03-31T00:00:00Z".parse().unwrap(),
            offset,
            batch_size,
        }
    }

    fn local_contact(account_id: Uuid, external_id: &str) -> ContactRow {
        ContactRow {
            id: Uuid::new_v4(),
            account_id,
            external_id: external_id.to_string(),
            name: Some("Ann Lee".to_string()),
            first_name: None,
            last_name: None,
            email: None,
            phone: None,
            source: None,
            timezone: None,
            tags: json!([]),
            custom_fields: json!([]),
            attribution: json!(null),
            date_added: None,
            local_date: None,
            local_week: None,
            local_month: None,
        }
    }

    #[tokio::test]
    async fn first_slice_reports_more_and_records_failures() {
        let server = MockServer::start().await;
        mount_calendars(&server).await;
        let session = test_session("tok");
        let contacts = MemoryContacts::default();
        let local = local_contact(session.account_id(), "c-1");
        contacts.insert(local.clone());
        let appointments = MemoryAppointments::default();
        let backfiller =
            AppointmentBackfiller::new(test_client(&server), contacts, appointments.clone());

        let summary = backfiller.backfill(&session, &options(0, 2)).await.unwrap();

        assert_eq!(summary.total_events, 3);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.failed, 1);
        assert!(summary.has_more);
        assert_eq!(summary.next_offset, Some(2));

        // ordered by start time: evt-1, evt-2, evt-3
        let logs = &summary.appointment_logs;
        assert_eq!(logs[0].event_id, "evt-1");
        assert_eq!(logs[0].status, AppointmentLogStatus::Created);
        assert_eq!(logs[1].event_id, "evt-2");
        assert_eq!(logs[1].status, AppointmentLogStatus::Failed);
        assert!(logs[1].message.as_deref().unwrap().contains("not found"));

        let stored = appointments.rows.lock().unwrap()["evt-1"].clone();
        assert_eq!(stored.contact_id, Some(local.id));
        assert!(stored.enrichments.contains(&EnrichmentData::SalesRep {
            user_id: "u-rep".to_string(),
            name: Some("Rita Rep".to_string()),
            email: Some("rita@example.com".to_string()),
        }));
        assert!(stored.enrichments.contains(&EnrichmentData::ContactEnriched {
            name: Some("Ann Lee".to_string()),
            email: Some("ann@example.com".to_string()),
            phone: None,
            tags: json!(["hot"]),
        }));
    }

    #[tokio::test]
    async fn last_slice_has_no_next_offset() {
        let server = MockServer::start().await;
        mount_calendars(&server).await;
        let backfiller = AppointmentBackfiller::new(
            test_client(&server),
            MemoryContacts::default(),
            MemoryAppointments::default(),
        );

        let summary = backfiller
            .backfill(&test_session("tok"), &options(2, 2))
            .await
            .unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.appointment_logs[0].event_id, "evt-3");
        assert!(!summary.has_more);
        assert!(summary.next_offset.is_none());
    }

    #[tokio::test]
    async fn offset_past_end_processes_nothing() {
        let server = MockServer::start().await;
        mount_calendars(&server).await;
        let backfiller = AppointmentBackfiller::new(
            test_client(&server),
            MemoryContacts::default(),
            MemoryAppointments::default(),
        );

        let summary = backfiller
            .backfill(&test_session("tok"), &options(10, 5))
            .await
            .unwrap();

        assert_eq!(summary.total_events, 3);
        assert_eq!(summary.processed, 0);
        assert!(!summary.has_more);
    }

    #[tokio::test]
    async fn users_are_looked_up_once_per_batch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/u-rep"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u-rep",
                "firstName": "Rita",
                "lastName": "Rep"
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_calendars(&server).await;
        let backfiller = AppointmentBackfiller::new(
            test_client(&server),
            MemoryContacts::default(),
            MemoryAppointments::default(),
        );

        let summary = backfiller
            .backfill(&test_session("tok"), &options(0, 10))
            .await
            .unwrap();

        assert_eq!(summary.created, 2);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn calendar_listing_error_aborts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;
        let backfiller = AppointmentBackfiller::new(
            test_client(&server),
            MemoryContacts::default(),
            MemoryAppointments::default(),
        );

        let err = backfiller
            .backfill(&test_session("tok"), &options(0, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Http { .. }));
    }
}
