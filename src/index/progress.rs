//! Build progress reporting over a channel.
//!
//! A build sends [`ProgressEvent`]s to an optional unbounded sender. The last
//! event of a build is `Complete` or `Cancelled`; after that the build drops
//! its sender, so a receiver loop ends on its own.

use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildPhase {
    Scanning,
    Parsing,
    Embedding,
    Finalizing,
    Complete,
    Cancelled,
}

impl std::fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BuildPhase::Scanning => "scanning",
            BuildPhase::Parsing => "parsing",
            BuildPhase::Embedding => "embedding",
            BuildPhase::Finalizing => "finalizing",
            BuildPhase::Complete => "complete",
            BuildPhase::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub phase: BuildPhase,
    pub current: usize,
    pub total: usize,
}

pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Cloneable handle used inside a build; a no-op without a subscriber.
#[derive(Debug, Clone, Default)]
pub(crate) struct ProgressReporter {
    sender: Option<ProgressSender>,
}

impl ProgressReporter {
    pub(crate) fn new(sender: Option<ProgressSender>) -> Self {
        Self { sender }
    }

    pub(crate) fn report(&self, phase: BuildPhase, current: usize, total: usize) {
        if let Some(sender) = &self.sender {
            // a dropped receiver just means nobody is watching
            let _ = sender.send(ProgressEvent { phase, current, total });
        }
    }
}
