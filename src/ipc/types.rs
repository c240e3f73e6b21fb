use std::path::PathBuf;

use serde::Deserialize;

use crate::config::Config;
use crate::db;
use crate::model::DataStore;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl Request {
    pub fn new(id: impl Into<String>, method: &str, params: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            method: method.to_string(),
            params,
        }
    }
}

/// Everything a handler may touch: the in-memory store, which stays
/// authoritative for the session, and where to persist and export it.
pub struct AppState {
    pub store: DataStore,
    pub db_path: PathBuf,
    pub export_dir: PathBuf,
    /// Set when an existing database could not be read. Saving would replace
    /// it with whatever this session holds, so every save is refused.
    pub save_blocked: Option<String>,
}

impl AppState {
    pub fn new(store: DataStore, config: &Config) -> Self {
        Self {
            store,
            db_path: config.db_path(),
            export_dir: config.export_dir.clone(),
            save_blocked: None,
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(reason) = &self.save_blocked {
            anyhow::bail!("saving is disabled for this session: {}", reason);
        }
        db::save_store(&self.store, &self.db_path)
    }
}
