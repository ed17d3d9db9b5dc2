use crate::ipc::error::ok;
use crate::ipc::helpers::{
    get_optional_str, get_required_str, get_required_text, with_store_mut, HandlerErr,
};
use crate::ipc::types::{AppState, Request, WorkspaceStore};
use crate::model::{StudentEntity, StudentFields};
use serde_json::json;

fn parse_student_fields(params: &serde_json::Value) -> Result<StudentFields, HandlerErr> {
    Ok(StudentFields {
        name: get_required_text(params, "name")?,
        email: get_optional_str(params, "email")?,
        roll_number: get_required_text(params, "rollNumber")?,
        class_id: get_required_text(params, "classId")?,
    })
}

fn student_row(store: &WorkspaceStore, s: &StudentEntity) -> serde_json::Value {
    json!({
        "id": s.id,
        "name": s.name,
        "email": s.email,
        "rollNumber": s.roll_number,
        "classId": s.class_id,
        "classLabel": store.class_label(&s.class_id),
        "todayStatus": store.student_status(&s.id)
    })
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return ok(&req.id, json!({ "students": [] }));
    };
    let all = req
        .params
        .get("all")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let rows: Vec<serde_json::Value> = if all {
        store.students().iter().map(|s| student_row(store, s)).collect()
    } else {
        store
            .filtered_students()
            .into_iter()
            .map(|s| student_row(store, s))
            .collect()
    };

    ok(
        &req.id,
        json!({
            "students": rows,
            "selectedClass": store.selected_class()
        }),
    )
}

fn students_create(
    store: &mut WorkspaceStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let fields = parse_student_fields(params)?;
    let student = store.add_student(fields);
    Ok(json!({ "studentId": student.id, "student": student }))
}

fn students_update(
    store: &mut WorkspaceStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let fields = parse_student_fields(params)?;
    let updated = store.update_student(&student_id, fields);
    Ok(json!({ "updated": updated }))
}

fn students_delete(
    store: &mut WorkspaceStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let summary = store.delete_student(&student_id);
    Ok(json!({
        "removed": summary.removed,
        "recordsRemoved": summary.dependents_removed
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.create" => Some(with_store_mut(state, req, students_create)),
        "students.update" => Some(with_store_mut(state, req, students_update)),
        "students.delete" => Some(with_store_mut(state, req, students_delete)),
        _ => None,
    }
}
