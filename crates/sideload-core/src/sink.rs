use crate::lifecycle::WorkflowState;
use chrono::{DateTime, Utc};
use sideload_schema::ItemId;
use tokio::sync::mpsc;
use tracing::info;

/// Receives every state transition of every run. Renders; never drives.
///
/// Implementations must tolerate being told the same terminal state twice.
pub trait StatusSink: Send + Sync {
    fn on_transition(&self, item: &ItemId, state: &WorkflowState);
}

/// Sink that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn on_transition(&self, item: &ItemId, state: &WorkflowState) {
        info!("{item}: {state}");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub item: ItemId,
    pub state: WorkflowState,
    pub at: DateTime<Utc>,
}

/// Forwards transitions to an unbounded channel so a front end can render them
/// on its own task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<StatusEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StatusSink for ChannelSink {
    fn on_transition(&self, item: &ItemId, state: &WorkflowState) {
        // A closed receiver means nobody is rendering any more.
        let _ = self.tx.send(StatusEvent {
            item: item.clone(),
            state: state.clone(),
            at: Utc::now(),
        });
    }
}
