use std::path::PathBuf;

use crate::config::AppConfig;
use crate::db::SqliteKv;
use crate::store::AttendanceStore;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub type WorkspaceStore = AttendanceStore<SqliteKv>;

pub struct AppState {
    pub config: AppConfig,
    pub workspace: Option<PathBuf>,
    pub store: Option<WorkspaceStore>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        AppState {
            config,
            workspace: None,
            store: None,
        }
    }
}
