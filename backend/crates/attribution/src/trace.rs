use serde::{Deserialize, Serialize};

use crate::strategies::StrategyKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The request carried no usable value for this strategy.
    Skipped,
    Miss,
    Hit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyAttempt {
    pub strategy: StrategyKind,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchTrace {
    pub attempts: Vec<StrategyAttempt>,
    pub matched: Option<StrategyKind>,
}

impl MatchTrace {
    pub fn record(&mut self, strategy: StrategyKind, outcome: AttemptOutcome) {
        if outcome == AttemptOutcome::Hit {
            self.matched = Some(strategy);
        }
        self.attempts.push(StrategyAttempt { strategy, outcome });
    }

    /// Strategies that actually queried storage.
    pub fn queried(&self) -> Vec<StrategyKind> {
        self.attempts
            .iter()
            .filter(|a| a.outcome != AttemptOutcome::Skipped)
            .map(|a| a.strategy)
            .collect()
    }
}
