use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    Init,
    Fetching,
    Processing,
    Complete,
    Error,
}

impl SyncStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStage::Complete | SyncStage::Error)
    }

    /// SSE event name for this stage.
    pub fn event_name(&self) -> &'static str {
        match self {
            SyncStage::Complete => "complete",
            SyncStage::Error => "error",
            _ => "progress",
        }
    }

    fn can_move_to(&self, next: SyncStage) -> bool {
        use SyncStage::*;
        matches!(
            (self, next),
            (Init, Fetching)
                | (Fetching, Processing)
                | (Processing, Fetching)
                | (Fetching | Processing, Complete)
                | (Init | Fetching | Processing, Error)
        )
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub stage: SyncStage,
    pub message: String,
    pub fetched: u64,
    pub processed: u64,
    pub upserted: u64,
    pub errors: u64,
    pub total_estimate: Option<u64>,
    pub percent: u8,
}

/// Receives progress events from a running sync.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);

    /// Checked between pages; a cancelled run stops before the next fetch.
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl ProgressSink for mpsc::UnboundedSender<ProgressEvent> {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.send(event);
    }

    fn is_cancelled(&self) -> bool {
        self.is_closed()
    }
}

/// Discards events. Used by non-streaming callers.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Counters {
    pub fetched: u64,
    pub processed: u64,
    pub upserted: u64,
    pub errors: u64,
}

/// Drives the `init → fetching ⇄ processing → complete | error` machine and
/// emits one event per transition. Illegal transitions are ignored.
pub struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    stage: SyncStage,
    counters: Counters,
    total_estimate: Option<u64>,
}

impl<'a> ProgressTracker<'a> {
    /// Start tracking; emits the `init` event.
    pub fn start(sink: &'a dyn ProgressSink, message: impl Into<String>) -> Self {
        let tracker = Self {
            sink,
            stage: SyncStage::Init,
            counters: Counters::default(),
            total_estimate: None,
        };
        tracker.sink.emit(tracker.event(message.into()));
        tracker
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn is_cancelled(&self) -> bool {
        self.sink.is_cancelled()
    }

    pub fn set_total_estimate(&mut self, total: Option<u64>) {
        if total.is_some() {
            self.total_estimate = total;
        }
    }

    pub fn record(&mut self, fetched: u64, processed: u64, upserted: u64, errors: u64) {
        self.counters.fetched += fetched;
        self.counters.processed += processed;
        self.counters.upserted += upserted;
        self.counters.errors += errors;
    }

    pub fn fetching(&mut self, message: impl Into<String>) -> bool {
        self.transition(SyncStage::Fetching, message.into())
    }

    pub fn processing(&mut self, message: impl Into<String>) -> bool {
        self.transition(SyncStage::Processing, message.into())
    }

    pub fn complete(&mut self, message: impl Into<String>) -> bool {
        self.transition(SyncStage::Complete, message.into())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        self.transition(SyncStage::Error, message.into())
    }

    /// Share of work done, capped at 90 until the run completes because the
    /// total is an estimate.
    pub fn percent(&self) -> u8 {
        if self.stage == SyncStage::Complete {
            return 100;
        }
        match self.total_estimate {
            Some(total) if total > 0 => {
                (self.counters.processed.saturating_mul(90) / total).min(90) as u8
            }
            _ => 0,
        }
    }

    fn transition(&mut self, next: SyncStage, message: String) -> bool {
        if !self.stage.can_move_to(next) {
            tracing::debug!(from = ?self.stage, to = ?next, "ignoring illegal progress transition");
            return false;
        }
        self.stage = next;
        self.sink.emit(self.event(message));
        true
    }

    fn event(&self, message: String) -> ProgressEvent {
        ProgressEvent {
            stage: self.stage,
            message,
            fetched: self.counters.fetched,
            processed: self.counters.processed,
            upserted: self.counters.upserted,
            errors: self.counters.errors,
            total_estimate: self.total_estimate,
            percent: self.percent(),
        }
    }
}
