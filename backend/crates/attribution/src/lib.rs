pub mod config;
pub mod engine;
pub mod strategies;
pub mod trace;

pub use config::AttributionConfig;
pub use engine::{match_session, AttributionMatch, AttributionSignals};
pub use strategies::StrategyKind;
pub use trace::MatchTrace;
