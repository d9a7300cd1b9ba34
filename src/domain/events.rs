use std::sync::mpsc::{self, Receiver, Sender};

use serde::Serialize;

use crate::domain::models::PlaybackState;

/// Notifications emitted by the playback controller to its observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "value", rename_all = "snake_case")]
pub enum ControllerEvent {
    StateChanged(PlaybackState),
    StationChanged(String),
    TrackChanged(Option<String>),
    VolumeChanged(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Fan-out of controller events, one channel per subscriber.
#[derive(Debug, Default)]
pub struct EventBus {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Sender<ControllerEvent>)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> (SubscriptionId, Receiver<ControllerEvent>) {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        let (tx, rx) = mpsc::channel();
        self.subscribers.push((id, tx));
        (id, rx)
    }

    /// Returns false when the id was not (or no longer) subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    pub fn emit(&mut self, event: ControllerEvent) {
        // Receivers that were dropped are pruned on the next emit.
        self.subscribers
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
