use crate::ipc::helpers::{
    get_optional_str, get_required_str, with_store, with_store_mut, HandlerErr,
};
use crate::ipc::types::{AppState, Request, WorkspaceStore};
use crate::model::AttendanceStatus;
use serde_json::json;

fn parse_status(params: &serde_json::Value) -> Result<AttendanceStatus, HandlerErr> {
    let raw = get_required_str(params, "status")?;
    raw.parse::<AttendanceStatus>().map_err(|message| HandlerErr {
        code: "bad_params",
        message,
        details: Some(json!({ "allowed": ["present", "absent", "late"] })),
    })
}

fn attendance_mark(
    store: &mut WorkspaceStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let status = parse_status(params)?;
    let record = store.mark_attendance(&student_id, status);
    Ok(json!({
        "recorded": record.is_some(),
        "record": record,
        "busy": store.is_busy()
    }))
}

fn attendance_status(
    store: &WorkspaceStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    Ok(json!({
        "studentId": student_id,
        "status": store.student_status(&student_id)
    }))
}

fn attendance_today(
    store: &WorkspaceStore,
    _params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({ "records": store.today_records() }))
}

fn attendance_history(
    store: &WorkspaceStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_optional_str(params, "classId")?;
    let student_id = get_optional_str(params, "studentId")?;
    let rows = store.history(class_id.as_deref(), student_id.as_deref());
    Ok(json!({ "rows": rows }))
}

fn attendance_stats(
    store: &WorkspaceStore,
    _params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let mut stats = json!(store.attendance_stats());
    stats["busy"] = json!(store.is_busy());
    Ok(stats)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.mark" => Some(with_store_mut(state, req, attendance_mark)),
        "attendance.status" => Some(with_store(state, req, attendance_status)),
        "attendance.today" => Some(with_store(state, req, attendance_today)),
        "attendance.stats" => Some(with_store(state, req, attendance_stats)),
        "attendance.history" => Some(with_store(state, req, attendance_history)),
        _ => None,
    }
}
