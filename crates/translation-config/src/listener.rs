//! Synchronous snapshot listeners.
//!
//! Listeners are plain callbacks invoked in subscription order with the newly
//! installed snapshot. A panicking listener is logged and skipped so the rest
//! of the list still runs.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::error;

use crate::snapshot::ConfigSnapshot;

/// Callback invoked with each installed snapshot.
pub type Listener = Arc<dyn Fn(&Arc<ConfigSnapshot>) + Send + Sync>;

/// Handle returned on subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Which list a listener belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    /// Consumers of configuration data.
    Data,
    /// UI refresh hooks, notified after data listeners.
    Ui,
}

impl ListenerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Ui => "ui",
        }
    }
}

/// Ordered list of listeners of one kind.
pub struct ListenerRegistry {
    kind: ListenerKind,
    entries: RwLock<Vec<(ListenerId, Listener)>>,
}

impl ListenerRegistry {
    pub fn new(kind: ListenerKind) -> Self {
        Self {
            kind,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Append a listener. Registering the same callback twice calls it twice.
    pub fn add<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Arc<ConfigSnapshot>) + Send + Sync + 'static,
    {
        let id = next_id();
        self.entries.write().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener, returning whether it was registered here.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Call every listener in order.
    ///
    /// The list is copied first, so listeners may subscribe, unsubscribe or
    /// call back into the store without deadlocking. Returns the number of
    /// listeners that completed without panicking.
    pub fn notify(&self, snapshot: &Arc<ConfigSnapshot>) -> usize {
        let listeners: Vec<Listener> = self
            .entries
            .read()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        let mut delivered = 0;
        for (index, listener) in listeners.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(snapshot))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    error!(
                        kind = self.kind.as_str(),
                        index,
                        "Config listener panicked: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
        delivered
    }
}

fn next_id() -> ListenerId {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    ListenerId(NEXT.fetch_add(1, Ordering::Relaxed))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recorder(
        log: &Arc<Mutex<Vec<&'static str>>>,
        name: &'static str,
    ) -> impl Fn(&Arc<ConfigSnapshot>) + Clone + Send + Sync + 'static {
        let log = log.clone();
        move |_| log.lock().push(name)
    }

    #[test]
    fn test_notify_in_subscription_order() {
        let registry = ListenerRegistry::new(ListenerKind::Data);
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.add(recorder(&log, "first"));
        registry.add(recorder(&log, "second"));
        registry.add(recorder(&log, "third"));

        let delivered = registry.notify(&Arc::new(ConfigSnapshot::default()));
        assert_eq!(delivered, 3);
        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_remove_listener() {
        let registry = ListenerRegistry::new(ListenerKind::Ui);
        let log = Arc::new(Mutex::new(Vec::new()));
        let keep = registry.add(recorder(&log, "keep"));
        let drop_id = registry.add(recorder(&log, "drop"));

        assert!(registry.remove(drop_id));
        assert!(!registry.remove(drop_id));
        assert_eq!(registry.len(), 1);

        registry.notify(&Arc::new(ConfigSnapshot::default()));
        assert_eq!(*log.lock(), vec!["keep"]);
        assert_ne!(keep, drop_id);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let registry = ListenerRegistry::new(ListenerKind::Data);
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.add(recorder(&log, "before"));
        registry.add(|_| panic!("listener failure"));
        registry.add(recorder(&log, "after"));

        let delivered = registry.notify(&Arc::new(ConfigSnapshot::default()));
        assert_eq!(delivered, 2);
        assert_eq!(*log.lock(), vec!["before", "after"]);
    }

    #[test]
    fn test_duplicate_registration_is_called_twice() {
        let registry = ListenerRegistry::new(ListenerKind::Data);
        let log = Arc::new(Mutex::new(Vec::new()));
        let listener = recorder(&log, "dup");
        registry.add(listener.clone());
        registry.add(listener);

        registry.notify(&Arc::new(ConfigSnapshot::default()));
        assert_eq!(log.lock().len(), 2);
    }
}
