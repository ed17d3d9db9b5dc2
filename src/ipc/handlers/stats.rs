use crate::ipc::helpers::{get_required_str, with_store, HandlerErr};
use crate::ipc::types::{AppState, Request, WorkspaceStore};
use serde_json::json;

fn stats_student(
    store: &WorkspaceStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    Ok(json!({
        "studentId": student_id,
        "name": store.student_name(&student_id),
        "stats": store.student_history_stats(&student_id)
    }))
}

fn stats_class(
    store: &WorkspaceStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    Ok(json!({
        "classId": class_id,
        "label": store.class_label(&class_id),
        "stats": store.class_history_stats(&class_id)
    }))
}

fn stats_overall(
    store: &WorkspaceStore,
    _params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({ "stats": store.overall_stats() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "stats.student" => Some(with_store(state, req, stats_student)),
        "stats.class" => Some(with_store(state, req, stats_class)),
        "stats.overall" => Some(with_store(state, req, stats_overall)),
        _ => None,
    }
}
