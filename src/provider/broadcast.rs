//! Fan-out of session-change events to subscribers.

use crate::session::Identity;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

/// Receiving half of a session-change subscription.
#[derive(Debug)]
pub struct SessionSubscription {
    receiver: mpsc::UnboundedReceiver<Option<Identity>>,
}

impl SessionSubscription {
    /// Wrap a raw receiver, for providers that manage their own fan-out.
    #[must_use]
    pub const fn from_receiver(receiver: mpsc::UnboundedReceiver<Option<Identity>>) -> Self {
        Self { receiver }
    }

    /// Wait for the next event. `None` means the provider went away.
    pub async fn recv(&mut self) -> Option<Option<Identity>> {
        self.receiver.recv().await
    }
}

#[derive(Debug, Default)]
struct BroadcastState {
    current: Option<Identity>,
    subscribers: Vec<mpsc::UnboundedSender<Option<Identity>>>,
}

/// Holds the provider-side current identity and pushes every change to all
/// live subscribers. Closed subscriptions are pruned on the next publish.
#[derive(Debug, Default)]
pub struct SessionBroadcaster {
    state: Mutex<BroadcastState>,
}

impl SessionBroadcaster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> SessionSubscription {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (sender, receiver) = mpsc::unbounded_channel();
        // The receiver is alive, so the initial send cannot fail.
        let _ = sender.send(state.current.clone());
        state.subscribers.push(sender);
        SessionSubscription { receiver }
    }

    pub fn publish(&self, identity: Option<Identity>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.current.clone_from(&identity);
        state
            .subscribers
            .retain(|subscriber| subscriber.send(identity.clone()).is_ok());
    }

    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .len()
    }
}
