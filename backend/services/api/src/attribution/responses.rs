use salesops_attribution::{AttributionMatch, StrategyKind};
use salesops_db::attribution::models::AttributionSession;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchAttributionResponse {
    pub matched: bool,
    pub strategy: Option<StrategyKind>,
    /// Strategies that queried storage, in the order tried.
    pub attempted: Vec<StrategyKind>,
    pub session: Option<AttributionSession>,
}

impl From<AttributionMatch> for MatchAttributionResponse {
    fn from(m: AttributionMatch) -> Self {
        Self {
            matched: m.session.is_some(),
            strategy: m.trace.matched,
            attempted: m.trace.queried(),
            session: m.session,
        }
    }
}
