use crate::provider::{IdentityProvider, SessionSubscription};
use crate::session::{Identity, SessionSnapshot};
use tokio::{sync::watch, task::JoinHandle};
use tracing::debug;

/// Process-wide session cell fed by the provider's change notifications.
///
/// Starts as [`SessionSnapshot::initializing`]; every notification atomically
/// replaces the identity and clears the initializing flag. If the provider
/// never reports, the holder stays initializing. Dropping the holder stops the
/// listener and with it the subscription.
#[derive(Debug)]
pub struct SessionHolder {
    state: watch::Receiver<SessionSnapshot>,
    listener: JoinHandle<()>,
}

impl SessionHolder {
    /// Subscribe to `provider` and start tracking its session. Must be called
    /// from within a Tokio runtime.
    pub fn start(provider: &dyn IdentityProvider) -> Self {
        Self::from_subscription(provider.subscribe_session_changes())
    }

    pub fn from_subscription(mut subscription: SessionSubscription) -> Self {
        let (sender, state) = watch::channel(SessionSnapshot::initializing());

        let listener = tokio::spawn(async move {
            while let Some(identity) = subscription.recv().await {
                debug!(
                    signed_in = identity.is_some(),
                    verified = identity.as_ref().is_some_and(|i| i.email_verified),
                    "session changed"
                );
                sender.send_replace(SessionSnapshot::resolved(identity));
            }
            debug!("session change stream closed");
        });

        Self { state, listener }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.state.borrow().current_identity().cloned()
    }

    #[must_use]
    pub fn is_initializing(&self) -> bool {
        self.state.borrow().is_initializing()
    }

    /// A receiver that observes every future snapshot.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.clone()
    }

    /// Wait until the first notification has been applied.
    pub async fn settled(&self) -> SessionSnapshot {
        self.wait_for(|snapshot| !snapshot.is_initializing()).await
    }

    /// Wait until `predicate` holds for the latest snapshot. If the provider
    /// goes away first, the last known snapshot is returned.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> SessionSnapshot {
        let mut state = self.state.clone();
        let snapshot = match state.wait_for(predicate).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        };
        snapshot
    }

    /// Stop listening for session changes.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for SessionHolder {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SessionBroadcaster;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn holder_starts_initializing_and_settles_on_first_event() -> anyhow::Result<()> {
        let broadcaster = SessionBroadcaster::new();
        let holder = SessionHolder::from_subscription(broadcaster.subscribe());

        let settled = timeout(Duration::from_secs(1), holder.settled()).await?;
        assert!(!settled.is_initializing());
        assert!(settled.current_identity().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn holder_replaces_identity_on_each_event() -> anyhow::Result<()> {
        let broadcaster = SessionBroadcaster::new();
        let holder = SessionHolder::from_subscription(broadcaster.subscribe());
        timeout(Duration::from_secs(1), holder.settled()).await?;

        broadcaster.publish(Some(Identity::new("u1", "a@x.com", true)));
        let snapshot = timeout(
            Duration::from_secs(1),
            holder.wait_for(SessionSnapshot::is_signed_in),
        )
        .await?;
        assert_eq!(
            snapshot.current_identity().map(|i| i.id.as_str()),
            Some("u1")
        );

        broadcaster.publish(None);
        let snapshot = timeout(
            Duration::from_secs(1),
            holder.wait_for(|snapshot| !snapshot.is_signed_in()),
        )
        .await?;
        assert!(snapshot.current_identity().is_none());
        assert!(holder.current_identity().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn holder_without_events_stays_initializing() {
        let (_sender, receiver) = tokio::sync::mpsc::unbounded_channel::<Option<Identity>>();
        // A subscription whose provider never emits.
        let holder = SessionHolder::from_subscription(SessionSubscription::from_receiver(receiver));
        tokio::task::yield_now().await;
        assert!(holder.is_initializing());
        assert!(
            timeout(Duration::from_millis(50), holder.settled())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn shutdown_unsubscribes() -> anyhow::Result<()> {
        let broadcaster = SessionBroadcaster::new();
        let holder = SessionHolder::from_subscription(broadcaster.subscribe());
        timeout(Duration::from_secs(1), holder.settled()).await?;
        holder.shutdown();

        // The aborted listener drops its subscription once the runtime polls it.
        for _ in 0..100 {
            broadcaster.publish(None);
            if broadcaster.subscriber_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(broadcaster.subscriber_count(), 0);
        Ok(())
    }
}
