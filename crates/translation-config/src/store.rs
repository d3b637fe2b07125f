//! The translation configuration store.
//!
//! [`ConfigStore`] holds the newest [`ConfigSnapshot`] it has been given and
//! tells observers whenever a newer one replaces it. Snapshots are ordered by
//! their `time` field; anything not strictly newer than the held snapshot is
//! dropped.
//!
//! Profile edits made through the store ([`ConfigStore::update_service_config`],
//! [`ConfigStore::set_concurrent_requests`]) only touch the held copy. They do
//! not bump the timestamp, do not notify anyone and are discarded as soon as
//! a newer snapshot arrives.

use std::fmt;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, RwLock};
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::events::{DEFAULT_EVENT_CAPACITY, SnapshotBroadcaster};
use crate::limit::{ConcurrencyLimit, DEFAULT_MAX_CONCURRENT_REQUESTS};
use crate::listener::{ListenerId, ListenerKind, ListenerRegistry};
use crate::snapshot::{
    ConfigSnapshot, DEFAULT_PROFILE, DEFAULT_SERVICE, MAX_CONCURRENT_REQUESTS_KEY, ServiceConfig,
};

#[derive(Default)]
struct StoreState {
    snapshot: Option<Arc<ConfigSnapshot>>,
    /// Recorded timestamp of `snapshot`, 0 until the first install.
    time: i64,
}

/// Observable cache of the current translation configuration.
///
/// Construct one per application and share it (usually as
/// `Arc<ConfigStore>`) with whatever needs configuration access.
pub struct ConfigStore {
    state: RwLock<StoreState>,
    /// Held across install and notification so observers see snapshots in
    /// install order. Reentrant so listeners may call back into the store.
    install: ReentrantMutex<()>,
    data_listeners: ListenerRegistry,
    ui_listeners: ListenerRegistry,
    events: SnapshotBroadcaster,
}

impl ConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create an empty store whose async event channel holds `capacity`
    /// snapshots per receiver.
    pub fn with_event_capacity(capacity: usize) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            install: ReentrantMutex::new(()),
            data_listeners: ListenerRegistry::new(ListenerKind::Data),
            ui_listeners: ListenerRegistry::new(ListenerKind::Ui),
            events: SnapshotBroadcaster::with_capacity(capacity),
        }
    }

    // ========== Snapshot lifecycle ==========

    /// Offer a snapshot to the store.
    ///
    /// The snapshot's timestamp is its `time` field, or the current time when
    /// that is missing or zero. It is installed when the store holds nothing
    /// yet or when the timestamp is strictly greater than the recorded one.
    /// After installing, data listeners run, then UI listeners, then async
    /// subscribers receive the snapshot.
    ///
    /// Returns whether the snapshot was installed.
    pub fn initialize(&self, snapshot: Option<ConfigSnapshot>) -> bool {
        let Some(snapshot) = snapshot else {
            warn!("Ignoring config initialization: no snapshot provided");
            return false;
        };

        let config_time = snapshot
            .time
            .filter(|time| *time != 0)
            .unwrap_or_else(now_millis);

        let _install = self.install.lock();
        let installed = {
            let mut state = self.state.write();
            let replace = state.snapshot.is_none() || state.time == 0 || config_time > state.time;
            if !replace {
                debug!(
                    config_time,
                    current_time = state.time,
                    "Ignoring stale translation config"
                );
                return false;
            }

            let snapshot = Arc::new(snapshot);
            state.snapshot = Some(snapshot.clone());
            state.time = config_time;
            snapshot
        };

        info!(config_time, "Initialized translation config");

        self.data_listeners.notify(&installed);
        self.ui_listeners.notify(&installed);
        self.events.publish(installed);
        true
    }

    /// Offer a snapshot in its JSON form. `null` counts as no snapshot.
    pub fn initialize_value(&self, value: Value) -> Result<bool> {
        if value.is_null() {
            return Ok(self.initialize(None));
        }
        let snapshot: ConfigSnapshot = serde_json::from_value(value)?;
        Ok(self.initialize(Some(snapshot)))
    }

    /// The held snapshot.
    ///
    /// The handle is immutable. Later edits through the store copy the
    /// snapshot first, so a handle keeps showing the state it was taken from.
    pub fn config(&self) -> Option<Arc<ConfigSnapshot>> {
        self.state.read().snapshot.clone()
    }

    /// Recorded timestamp of the held snapshot, 0 before the first install.
    pub fn config_time(&self) -> i64 {
        self.state.read().time
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().snapshot.is_some()
    }

    // ========== Active selection ==========

    /// Name of the active translation service, `"google"` when unknown.
    pub fn active_service(&self) -> String {
        resolve_active_service(self.state.read().snapshot.as_deref())
    }

    /// Name of the active profile, `"default"` when unknown.
    pub fn active_config(&self) -> String {
        resolve_active_config(self.state.read().snapshot.as_deref())
    }

    // ========== Service profiles ==========

    /// Copy of a service profile with defaults applied to the copy.
    ///
    /// Returns `None` when any step of the lookup is missing. The held
    /// snapshot is never modified; see [`materialize_defaults`](Self::materialize_defaults)
    /// to persist defaults.
    pub fn service_config(&self, service: &str, profile: &str) -> Option<ServiceConfig> {
        let state = self.state.read();
        let mut config = state.snapshot.as_ref()?.profile(service, profile)?.clone();
        config.fill_defaults();
        Some(config)
    }

    /// Write the default `max_concurrent_requests` into a held profile that
    /// lacks it.
    ///
    /// Returns whether the profile exists. Listeners are not notified.
    pub fn materialize_defaults(&self, service: &str, profile: &str) -> bool {
        let mut state = self.state.write();
        let Some(snapshot) = state.snapshot.as_mut() else {
            return false;
        };
        let needs_default = match snapshot.profile(service, profile) {
            None => return false,
            Some(config) => config.get(MAX_CONCURRENT_REQUESTS_KEY).is_none(),
        };

        if !needs_default {
            return true;
        }

        if let Some(config) = Arc::make_mut(snapshot).profile_mut(service, profile) {
            config.fill_defaults();
            debug!(
                service,
                profile,
                "Stored default max_concurrent_requests={DEFAULT_MAX_CONCURRENT_REQUESTS}"
            );
        }
        true
    }

    /// Shallow-merge `patch` into an existing profile of the held snapshot.
    ///
    /// The service and the profile must already exist. The edit is local: no
    /// timestamp change, no notification.
    pub fn update_service_config(
        &self,
        service: &str,
        profile: &str,
        patch: Map<String, Value>,
    ) -> Result<()> {
        let mut state = self.state.write();
        let Some(snapshot) = state.snapshot.as_mut() else {
            error!(service, profile, "Service or config does not exist: config not initialized");
            return Err(Error::service_not_found(service, profile));
        };

        if !snapshot.has_service(service) {
            error!(service, profile, "Service or config does not exist");
            return Err(Error::service_not_found(service, profile));
        }
        if snapshot.profile(service, profile).is_none() {
            error!(service, profile, "Service or config does not exist");
            return Err(Error::profile_not_found(service, profile));
        }

        let config = Arc::make_mut(snapshot)
            .profile_mut(service, profile)
            .ok_or_else(|| Error::profile_not_found(service, profile))?;
        config.merge(patch);

        debug!(service, profile, "Updated service config in memory");
        Ok(())
    }

    // ========== Concurrency ==========

    /// Effective `max_concurrent_requests` for a profile.
    ///
    /// `None` or empty arguments resolve to the active service and profile.
    /// Falls back to 3 when the profile or its value is missing.
    pub fn concurrent_requests(&self, service: Option<&str>, profile: Option<&str>) -> u32 {
        let state = self.state.read();
        let snapshot = state.snapshot.as_deref();

        let service = match service.filter(|s| !s.is_empty()) {
            Some(service) => service.to_owned(),
            None => resolve_active_service(snapshot),
        };
        let profile = match profile.filter(|p| !p.is_empty()) {
            Some(profile) => profile.to_owned(),
            None => resolve_active_config(snapshot),
        };

        snapshot
            .and_then(|snapshot| snapshot.profile(&service, &profile))
            .map_or(
                DEFAULT_MAX_CONCURRENT_REQUESTS,
                ServiceConfig::effective_max_concurrent_requests,
            )
    }

    /// Parse `value` and store it as the profile's `max_concurrent_requests`.
    ///
    /// Fails without touching the snapshot when `value` is not an integer in
    /// `1..=10` or when the profile does not exist.
    pub fn set_concurrent_requests(&self, service: &str, profile: &str, value: &str) -> Result<()> {
        let limit = ConcurrencyLimit::parse(value).inspect_err(|e| {
            error!(service, profile, "{e}");
        })?;
        self.set_concurrency_limit(service, profile, limit)
    }

    /// Store an already validated limit.
    pub fn set_concurrency_limit(
        &self,
        service: &str,
        profile: &str,
        limit: ConcurrencyLimit,
    ) -> Result<()> {
        let mut patch = Map::new();
        patch.insert(
            MAX_CONCURRENT_REQUESTS_KEY.to_string(),
            Value::from(limit.get()),
        );
        self.update_service_config(service, profile, patch)
    }

    // ========== Observers ==========

    /// Register a data listener, called with every installed snapshot.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Arc<ConfigSnapshot>) + Send + Sync + 'static,
    {
        self.data_listeners.add(listener)
    }

    /// Register a UI listener, called after all data listeners.
    pub fn subscribe_ui<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Arc<ConfigSnapshot>) + Send + Sync + 'static,
    {
        self.ui_listeners.add(listener)
    }

    /// Remove a data or UI listener. Returns whether it was registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.data_listeners.remove(id) || self.ui_listeners.remove(id)
    }

    /// Number of registered data and UI listeners.
    pub fn listener_count(&self) -> (usize, usize) {
        (self.data_listeners.len(), self.ui_listeners.len())
    }

    /// Receive installed snapshots asynchronously.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Arc<ConfigSnapshot>> {
        self.events.subscribe()
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("ConfigStore")
            .field("initialized", &state.snapshot.is_some())
            .field("config_time", &state.time)
            .field("data_listeners", &self.data_listeners.len())
            .field("ui_listeners", &self.ui_listeners.len())
            .field("event_subscribers", &self.events.subscriber_count())
            .finish()
    }
}

fn resolve_active_service(snapshot: Option<&ConfigSnapshot>) -> String {
    let Some(snapshot) = snapshot else {
        warn!("Config not initialized, using default service: {DEFAULT_SERVICE}");
        return DEFAULT_SERVICE.to_string();
    };
    match snapshot.active_service.as_deref().filter(|s| !s.is_empty()) {
        Some(service) => service.to_string(),
        None => {
            warn!("Config has no active service, using default: {DEFAULT_SERVICE}");
            DEFAULT_SERVICE.to_string()
        }
    }
}

fn resolve_active_config(snapshot: Option<&ConfigSnapshot>) -> String {
    let Some(snapshot) = snapshot else {
        warn!("Config not initialized, using default config: {DEFAULT_PROFILE}");
        return DEFAULT_PROFILE.to_string();
    };
    match snapshot.active_config.as_deref().filter(|s| !s.is_empty()) {
        Some(profile) => profile.to_string(),
        None => {
            warn!("Config has no active config, using default: {DEFAULT_PROFILE}");
            DEFAULT_PROFILE.to_string()
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
