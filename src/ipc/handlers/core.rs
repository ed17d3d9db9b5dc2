use crate::clock::SystemClock;
use crate::db::SqliteKv;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::AttendanceStore;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Opens (creating if needed) the workspace database and loads the store
/// from it, replacing whatever workspace was open before.
pub fn open_workspace(state: &mut AppState, path: &Path) -> anyhow::Result<()> {
    let kv = SqliteKv::open(path)?;
    let store = AttendanceStore::load(kv, Box::new(SystemClock), state.config.busy_delay);
    state.workspace = Some(path.to_path_buf());
    state.store = Some(store);
    info!(workspace = %path.display(), "workspace opened");
    Ok(())
}

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match open_workspace(state, &path) {
        Ok(()) => ok(&req.id, json!({ "workspacePath": path.to_string_lossy() })),
        Err(e) => {
            error!(workspace = %path.display(), error = ?e, "failed to open workspace");
            err(&req.id, "db_open_failed", format!("{e:?}"), None)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
