use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::upsert::ExternalRow;

/// Metadata attached to an appointment, one variant per enrichment source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum EnrichmentData {
    /// Snapshot of the calendar event as returned by the CRM.
    AppointmentApi {
        calendar_id: Option<String>,
        status: Option<String>,
        raw: serde_json::Value,
    },
    ContactEnriched {
        name: Option<String>,
        email: Option<String>,
        phone: Option<String>,
        /// CRM tags, kept as the provider sent them.
        #[serde(default = "empty_list")]
        tags: serde_json::Value,
    },
    /// Who booked the appointment.
    Setter {
        user_id: Option<String>,
        name: Option<String>,
    },
    /// Who is assigned to run it.
    SalesRep {
        user_id: String,
        name: Option<String>,
        email: Option<String>,
    },
}

fn empty_list() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}

impl EnrichmentData {
    pub fn source(&self) -> &'static str {
        match self {
            EnrichmentData::AppointmentApi { .. } => "appointment_api",
            EnrichmentData::ContactEnriched { .. } => "contact_enriched",
            EnrichmentData::Setter { .. } => "setter",
            EnrichmentData::SalesRep { .. } => "sales_rep",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentRow {
    pub id: Uuid,
    pub account_id: Uuid,
    pub external_id: String,
    pub calendar_id: Option<String>,
    pub contact_external_id: Option<String>,
    /// Local contact this appointment is linked to, when already synced.
    pub contact_id: Option<Uuid>,
    pub title: Option<String>,
    pub status: Option<String>,
    pub assigned_user_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub local_date: Option<NaiveDate>,
    pub local_week: Option<NaiveDate>,
    pub local_month: Option<NaiveDate>,
    pub enrichments: Vec<EnrichmentData>,
}

impl ExternalRow for AppointmentRow {
    fn account_id(&self) -> Uuid {
        self.account_id
    }

    fn external_id(&self) -> &str {
        &self.external_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enrichment_serializes_with_source_tag() {
        let data = EnrichmentData::SalesRep {
            user_id: "u-1".to_string(),
            name: Some("Rita Rep".to_string()),
            email: None,
        };
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["source"], "sales_rep");
        assert_eq!(json["user_id"], "u-1");
        assert_eq!(data.source(), "sales_rep");
    }

    #[test]
    fn enrichment_round_trips_through_json() {
        let json = serde_json::json!({
            "source": "contact_enriched",
            "name": "Ann Lee",
            "email": "ann@example.com",
            "phone": null
        });
        let data: EnrichmentData = serde_json::from_value(json).unwrap();
        match data {
            EnrichmentData::ContactEnriched { name, tags, .. } => {
                assert_eq!(name.as_deref(), Some("Ann Lee"));
                assert_eq!(tags, serde_json::json!([]));
            }
            other => panic!("expected ContactEnriched, got {other:?}"),
        }
    }

    #[test]
    fn unknown_source_is_rejected() {
        let json = serde_json::json!({ "source": "mystery" });
        assert!(serde_json::from_value::<EnrichmentData>(json).is_err());
    }
}
