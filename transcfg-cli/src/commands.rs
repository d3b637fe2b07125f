//! Command implementations. Each returns a serializable report so the output
//! layer can render it in any format.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};
use translation_config::{ConfigSnapshot, ConfigStore};

/// Outcome of offering one snapshot file to the store.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub path: PathBuf,
    pub time: Option<i64>,
    pub accepted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub loaded: Vec<LoadReport>,
    pub config_time: i64,
    pub active_service: String,
    pub active_config: String,
    pub max_concurrent_requests: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConcurrencyReport {
    pub service: String,
    pub profile: String,
    pub max_concurrent_requests: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileReport {
    pub service: String,
    pub profile: String,
    pub config: Map<String, Value>,
    pub written: Option<PathBuf>,
}

fn read_snapshot(path: &Path) -> Result<ConfigSnapshot> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid snapshot JSON in {}", path.display()))
}

/// Offer every file to the store in order.
pub fn load_files(store: &ConfigStore, files: &[PathBuf]) -> Result<Vec<LoadReport>> {
    files
        .iter()
        .map(|path| {
            let snapshot = read_snapshot(path)?;
            let time = snapshot.time;
            let accepted = store.initialize(Some(snapshot));
            debug!(path = %path.display(), ?time, accepted, "Offered snapshot");
            Ok(LoadReport {
                path: path.clone(),
                time,
                accepted,
            })
        })
        .collect()
}

pub fn show(store: &ConfigStore, files: &[PathBuf]) -> Result<Summary> {
    let loaded = load_files(store, files)?;
    Ok(Summary {
        loaded,
        config_time: store.config_time(),
        active_service: store.active_service(),
        active_config: store.active_config(),
        max_concurrent_requests: store.concurrent_requests(None, None),
    })
}

pub fn get(
    store: &ConfigStore,
    files: &[PathBuf],
    service: Option<&str>,
    profile: Option<&str>,
) -> Result<ConcurrencyReport> {
    load_files(store, files)?;
    let service = service.map_or_else(|| store.active_service(), str::to_owned);
    let profile = profile.map_or_else(|| store.active_config(), str::to_owned);
    let max_concurrent_requests = store.concurrent_requests(Some(&service), Some(&profile));
    Ok(ConcurrencyReport {
        service,
        profile,
        max_concurrent_requests,
    })
}

pub fn set(
    store: &ConfigStore,
    file: &Path,
    service: &str,
    profile: &str,
    value: &str,
    write: bool,
) -> Result<ProfileReport> {
    load_files(store, &[file.to_path_buf()])?;
    store
        .set_concurrent_requests(service, profile, value)
        .with_context(|| format!("Failed to update {service}/{profile}"))?;

    let config = store
        .service_config(service, profile)
        .map(|config| config.into_map())
        .unwrap_or_default();

    let written = if write {
        let snapshot = store
            .config()
            .context("No snapshot loaded, nothing to write")?;
        let json = serde_json::to_string_pretty(&*snapshot)?;
        fs::write(file, json + "\n")
            .with_context(|| format!("Failed to write snapshot {}", file.display()))?;
        info!(path = %file.display(), "Wrote updated snapshot");
        Some(file.to_path_buf())
    } else {
        None
    };

    Ok(ProfileReport {
        service: service.to_string(),
        profile: profile.to_string(),
        config,
        written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_json(dir: &TempDir, name: &str, value: Value) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();
        path
    }

    fn snapshot_json(time: i64, service: &str) -> Value {
        json!({
            "time": time,
            "active_service": service,
            "services": {
                "openai": { "configs": { "default": { "model": "mini", "max_concurrent_requests": 4 } } },
                "deepl": { "configs": { "default": {} } }
            }
        })
    }

    #[test]
    fn test_show_reports_accepted_files() {
        let dir = TempDir::new().unwrap();
        let newer = write_json(&dir, "newer.json", snapshot_json(20, "openai"));
        let older = write_json(&dir, "older.json", snapshot_json(10, "deepl"));

        let store = ConfigStore::new();
        let summary = show(&store, &[newer, older]).unwrap();

        let accepted: Vec<bool> = summary.loaded.iter().map(|r| r.accepted).collect();
        assert_eq!(accepted, vec![true, false]);
        assert_eq!(summary.config_time, 20);
        assert_eq!(summary.active_service, "openai");
        assert_eq!(summary.active_config, "default");
        assert_eq!(summary.max_concurrent_requests, 4);
    }

    #[test]
    fn test_get_with_explicit_service() {
        let dir = TempDir::new().unwrap();
        let path = write_json(&dir, "config.json", snapshot_json(1, "openai"));

        let store = ConfigStore::new();
        let report = get(&store, &[path], Some("deepl"), None).unwrap();
        assert_eq!(report.service, "deepl");
        assert_eq!(report.profile, "default");
        assert_eq!(report.max_concurrent_requests, 3);
    }

    #[test]
    fn test_set_writes_back() {
        let dir = TempDir::new().unwrap();
        let path = write_json(&dir, "config.json", snapshot_json(1, "openai"));

        let store = ConfigStore::new();
        let report = set(&store, &path, "openai", "default", "7", true).unwrap();
        assert_eq!(report.config["max_concurrent_requests"], json!(7));
        assert_eq!(report.config["model"], json!("mini"));
        assert_eq!(report.written.as_deref(), Some(path.as_path()));

        let saved: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            saved["services"]["openai"]["configs"]["default"]["max_concurrent_requests"],
            json!(7)
        );
        assert_eq!(saved["time"], json!(1));
    }

    #[test]
    fn test_set_rejects_invalid_value_without_writing() {
        let dir = TempDir::new().unwrap();
        let path = write_json(&dir, "config.json", snapshot_json(1, "openai"));
        let before = fs::read_to_string(&path).unwrap();

        let store = ConfigStore::new();
        assert!(set(&store, &path, "openai", "default", "11", true).is_err());
        assert!(set(&store, &path, "missing", "default", "5", true).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let store = ConfigStore::new();
        let err = show(&store, &[path]).unwrap_err();
        assert!(err.to_string().contains("Invalid snapshot JSON"));
    }
}
