//! Async delivery of installed snapshots.
//!
//! Synchronous listeners run inline during [`ConfigStore::initialize`]. Tasks
//! that would rather `await` a configuration change hold a receiver from
//! [`ConfigStore::subscribe_events`] instead.
//!
//! [`ConfigStore::initialize`]: crate::ConfigStore::initialize
//! [`ConfigStore::subscribe_events`]: crate::ConfigStore::subscribe_events

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::snapshot::ConfigSnapshot;

/// Snapshots buffered per receiver before the oldest are dropped.
pub const DEFAULT_EVENT_CAPACITY: usize = 16;

/// Fan-out of installed snapshots to async receivers.
///
/// Only the newest snapshot matters, so a receiver that falls more than the
/// capacity behind loses the oldest ones and sees `RecvError::Lagged`.
pub struct SnapshotBroadcaster {
    sender: broadcast::Sender<Arc<ConfigSnapshot>>,
}

impl SnapshotBroadcaster {
    /// A zero capacity is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ConfigSnapshot>> {
        self.sender.subscribe()
    }

    /// Hand `snapshot` to every receiver. Returns how many got it.
    pub fn publish(&self, snapshot: Arc<ConfigSnapshot>) -> usize {
        let time = snapshot.time;
        match self.sender.send(snapshot) {
            Ok(receivers) => {
                tracing::debug!(?time, receivers, "Published config snapshot");
                receivers
            }
            Err(_) => 0,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamped(time: i64) -> Arc<ConfigSnapshot> {
        Arc::new(ConfigSnapshot {
            time: Some(time),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_zero_capacity_still_delivers() {
        let broadcaster = SnapshotBroadcaster::with_capacity(0);
        let mut receiver = broadcaster.subscribe();

        broadcaster.publish(stamped(3));
        assert_eq!(receiver.recv().await.unwrap().time, Some(3));
    }

    #[tokio::test]
    async fn test_receivers_share_one_allocation() {
        let broadcaster = SnapshotBroadcaster::with_capacity(4);
        let mut panel = broadcaster.subscribe();
        let mut pool = broadcaster.subscribe();

        let sent = stamped(7);
        assert_eq!(broadcaster.publish(sent.clone()), 2);

        assert!(Arc::ptr_eq(&panel.recv().await.unwrap(), &sent));
        assert!(Arc::ptr_eq(&pool.recv().await.unwrap(), &sent));
    }

    #[test]
    fn test_dropped_receivers_are_not_counted() {
        let broadcaster = SnapshotBroadcaster::with_capacity(4);
        let receiver = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 1);

        drop(receiver);
        assert_eq!(broadcaster.subscriber_count(), 0);
        assert_eq!(broadcaster.publish(stamped(1)), 0);
    }

    #[tokio::test]
    async fn test_lagging_receiver_skips_old_snapshots() {
        let broadcaster = SnapshotBroadcaster::with_capacity(2);
        let mut receiver = broadcaster.subscribe();

        for time in 1..=4 {
            broadcaster.publish(stamped(time));
        }

        assert!(matches!(
            receiver.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        assert_eq!(receiver.recv().await.unwrap().time, Some(3));
        assert_eq!(receiver.recv().await.unwrap().time, Some(4));
    }
}
