use serde::{Deserialize, Serialize};

use crate::strategies::StrategyKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionConfig {
    /// Strategies tried in order; the first hit wins. Repeats are ignored.
    pub priority: Vec<StrategyKind>,
    /// How far back fuzzy lookups (everything but session id) may reach.
    pub lookback_days: i64,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            priority: vec![
                StrategyKind::SessionId,
                StrategyKind::Fbclid,
                StrategyKind::UtmCampaign,
                StrategyKind::Fingerprint,
            ],
            lookback_days: 30,
        }
    }
}
