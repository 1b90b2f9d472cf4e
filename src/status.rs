//! Status stream from the worker to the host

use crossbeam_channel::Sender;

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Stop was requested
    Stopped,
    /// Templates or detectors could not be set up
    InitFailed(String),
    /// The worker hit an unrecoverable error
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    Log(String),
    /// Always the last event of a session
    Finished(SessionOutcome),
}

/// Sending half of the status stream.
///
/// Every line is mirrored to `tracing`. A host that dropped its receiver only
/// loses the channel copy.
#[derive(Debug, Clone)]
pub struct StatusSink {
    tx: Option<Sender<StatusEvent>>,
}

impl StatusSink {
    pub fn new(tx: Sender<StatusEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Log to `tracing` only
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn log(&self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!(target: "trailblazer::status", "{line}");
        self.send(StatusEvent::Log(line));
    }

    pub fn warn(&self, line: impl Into<String>) {
        let line = line.into();
        tracing::warn!(target: "trailblazer::status", "{line}");
        self.send(StatusEvent::Log(line));
    }

    pub fn finish(&self, outcome: SessionOutcome) {
        tracing::info!(target: "trailblazer::status", ?outcome, "session finished");
        self.send(StatusEvent::Finished(outcome));
    }

    fn send(&self, event: StatusEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
