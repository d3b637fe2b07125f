//! Observable in-memory cache for translation service configuration.
//!
//! The [`ConfigStore`] keeps the newest [`ConfigSnapshot`] describing which
//! translation service and profile are active along with per-profile
//! tunables, and notifies listeners when a newer snapshot is installed.
//!
//! ```
//! use std::sync::Arc;
//! use translation_config::{ConfigSnapshot, ConfigStore};
//!
//! let store = Arc::new(ConfigStore::new());
//! store.subscribe(|snapshot| println!("config changed at {:?}", snapshot.time));
//!
//! let snapshot: ConfigSnapshot = serde_json::from_str(
//!     r#"{"time": 1, "active_service": "deepl",
//!         "services": {"deepl": {"configs": {"default": {}}}}}"#,
//! )
//! .unwrap();
//! store.initialize(Some(snapshot));
//!
//! store.set_concurrent_requests("deepl", "default", "5").unwrap();
//! assert_eq!(store.concurrent_requests(None, None), 5);
//! ```

pub mod error;
pub mod events;
pub mod limit;
pub mod listener;
pub mod snapshot;
pub mod store;

pub use error::{Error, Result};
pub use events::{DEFAULT_EVENT_CAPACITY, SnapshotBroadcaster};
pub use limit::{
    ConcurrencyLimit, DEFAULT_MAX_CONCURRENT_REQUESTS, MAX_CONCURRENT_REQUESTS,
    MIN_CONCURRENT_REQUESTS,
};
pub use listener::{Listener, ListenerId, ListenerKind, ListenerRegistry};
pub use snapshot::{
    ConfigSnapshot, DEFAULT_PROFILE, DEFAULT_SERVICE, MAX_CONCURRENT_REQUESTS_KEY, ServiceConfig,
    ServiceEntry,
};
pub use store::ConfigStore;
