//! Translation configuration snapshot model.
//!
//! A snapshot is the complete configuration delivered by whatever component
//! feeds the store. Its JSON shape is the wire contract:
//!
//! ```json
//! {
//!   "time": 1700000000000,
//!   "active_service": "openai",
//!   "active_config": "default",
//!   "services": {
//!     "openai": { "configs": { "default": { "model": "gpt-4o", "max_concurrent_requests": 4 } } }
//!   }
//! }
//! ```
//!
//! Fields the model does not know about are carried through untouched.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

use crate::limit::DEFAULT_MAX_CONCURRENT_REQUESTS;

/// Key of the per-profile concurrency tunable.
pub const MAX_CONCURRENT_REQUESTS_KEY: &str = "max_concurrent_requests";

/// Service selected when a snapshot does not name one.
pub const DEFAULT_SERVICE: &str = "google";

/// Profile selected when a snapshot does not name one.
pub const DEFAULT_PROFILE: &str = "default";

/// The complete configuration held at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Milliseconds timestamp used for recency comparison. Fractional
    /// values on the wire are truncated.
    #[serde(
        default,
        deserialize_with = "deserialize_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_service: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_config: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<BTreeMap<String, ServiceEntry>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigSnapshot {
    /// Look up a profile of a service.
    pub fn profile(&self, service: &str, profile: &str) -> Option<&ServiceConfig> {
        self.services
            .as_ref()?
            .get(service)?
            .configs
            .as_ref()?
            .get(profile)
    }

    /// Mutable lookup, same resolution as [`profile`](Self::profile).
    pub fn profile_mut(&mut self, service: &str, profile: &str) -> Option<&mut ServiceConfig> {
        self.services
            .as_mut()?
            .get_mut(service)?
            .configs
            .as_mut()?
            .get_mut(profile)
    }

    /// Whether `service` is present in the `services` map.
    pub fn has_service(&self, service: &str) -> bool {
        self.services
            .as_ref()
            .is_some_and(|services| services.contains_key(service))
    }
}

/// Accept any JSON number as a timestamp: integers as-is, `u64` values past
/// `i64::MAX` saturated, finite floats truncated toward zero.
fn deserialize_time<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<Number>::deserialize(deserializer)? else {
        return Ok(None);
    };

    if let Some(time) = number.as_i64() {
        return Ok(Some(time));
    }
    if let Some(time) = number.as_u64() {
        return Ok(Some(i64::try_from(time).unwrap_or(i64::MAX)));
    }
    match number.as_f64() {
        Some(time) if time.is_finite() => Ok(Some(time.trunc() as i64)),
        _ => Err(D::Error::custom(format!("invalid timestamp: {number}"))),
    }
}

/// Per-service record holding its named profiles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configs: Option<BTreeMap<String, ServiceConfig>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A named bundle of tunables for one service.
///
/// Profiles are open-ended JSON objects; only `max_concurrent_requests` has a
/// typed view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceConfig(Map<String, Value>);

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored concurrency limit, if it is an integral number that fits `u32`.
    pub fn max_concurrent_requests(&self) -> Option<u32> {
        self.0
            .get(MAX_CONCURRENT_REQUESTS_KEY)
            .and_then(Value::as_u64)
            .and_then(|value| u32::try_from(value).ok())
    }

    /// Stored concurrency limit or the default.
    pub fn effective_max_concurrent_requests(&self) -> u32 {
        self.max_concurrent_requests()
            .unwrap_or(DEFAULT_MAX_CONCURRENT_REQUESTS)
    }

    /// Write the default concurrency limit when the key is missing.
    ///
    /// Returns `true` when a value was written.
    pub fn fill_defaults(&mut self) -> bool {
        if self.0.contains_key(MAX_CONCURRENT_REQUESTS_KEY) {
            return false;
        }
        self.0.insert(
            MAX_CONCURRENT_REQUESTS_KEY.to_string(),
            Value::from(DEFAULT_MAX_CONCURRENT_REQUESTS),
        );
        true
    }

    /// Shallow merge: keys in `patch` overwrite, everything else is kept.
    pub fn merge(&mut self, patch: Map<String, Value>) {
        self.0.extend(patch);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}
