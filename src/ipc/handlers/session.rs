use crate::ipc::helpers::{get_required_text, with_store, with_store_mut, HandlerErr};
use crate::ipc::types::{AppState, Request, WorkspaceStore};
use serde_json::json;

fn session_get(
    store: &WorkspaceStore,
    _params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({ "session": store.current_session() }))
}

fn session_start(
    store: &mut WorkspaceStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let subject = get_required_text(params, "subject")?;
    let started = store.start_session(&subject);
    Ok(json!({
        "session": started.session,
        "replacedSessionId": started.replaced.map(|s| s.id)
    }))
}

fn session_end(
    store: &mut WorkspaceStore,
    _params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({ "ended": store.end_session() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.get" => Some(with_store(state, req, session_get)),
        "session.start" => Some(with_store_mut(state, req, session_start)),
        "session.end" => Some(with_store_mut(state, req, session_end)),
        _ => None,
    }
}
