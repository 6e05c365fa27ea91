use salesops_attribution::AttributionSignals;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchAttributionRequest {
    pub account_id: Uuid,
    pub session_id: Option<String>,
    pub fbclid: Option<String>,
    pub utm_campaign: Option<String>,
    pub fingerprint: Option<String>,
}

impl MatchAttributionRequest {
    pub fn signals(&self) -> AttributionSignals {
        AttributionSignals {
            session_id: self.session_id.clone(),
            fbclid: self.fbclid.clone(),
            utm_campaign: self.utm_campaign.clone(),
            fingerprint: self.fingerprint.clone(),
        }
    }
}
