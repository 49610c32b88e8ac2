//! Configuration change notifications
//!
//! Fans out [`ConfigurationChange`] events to any number of subscribers over
//! unbounded crossbeam channels. Events are produced on the control thread
//! after a successful reconfiguration, or on the platform's stream error
//! thread when a device disappears. The real-time data callback never
//! touches the notifier.

use std::sync::Mutex;

use crossbeam::channel::{unbounded, Receiver, Sender};

use super::config::StreamConfiguration;
use crate::types::Direction;

/// Something about the open device changed
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationChange {
    /// A new configuration was applied
    Reconfigured(StreamConfiguration),
    /// The platform reported the device as gone or the stream as invalid
    DeviceLost { direction: Direction, message: String },
    /// The session no longer has an open device
    Closed,
}

/// Subscriber list for [`ConfigurationChange`] events
#[derive(Default)]
pub struct ChangeNotifier {
    subscribers: Mutex<Vec<Sender<ConfigurationChange>>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber
    ///
    /// Dropping the receiver unsubscribes; the sender is pruned on the next
    /// notification.
    pub fn subscribe(&self) -> Receiver<ConfigurationChange> {
        let (tx, rx) = unbounded();
        self.lock().push(tx);
        rx
    }

    /// Deliver an event to every live subscriber
    pub fn notify(&self, change: ConfigurationChange) {
        let mut subscribers = self.lock();
        subscribers.retain(|tx| tx.send(change.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Sender<ConfigurationChange>>> {
        // A panic while holding the list cannot leave it inconsistent
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
