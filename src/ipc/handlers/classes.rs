use crate::ipc::error::ok;
use crate::ipc::helpers::{
    get_optional_str, get_required_str, get_required_text, with_store_mut, HandlerErr,
};
use crate::ipc::types::{AppState, Request, WorkspaceStore};
use serde_json::json;

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return ok(&req.id, json!({ "classes": [] }));
    };

    // Counts let the class picker show roster sizes without a second call.
    let classes: Vec<serde_json::Value> = store
        .classes()
        .iter()
        .map(|c| {
            let student_count = store
                .students()
                .iter()
                .filter(|s| s.class_id == c.id)
                .count();
            json!({
                "id": c.id,
                "name": c.name,
                "section": c.section,
                "label": store.class_label(&c.id),
                "studentCount": student_count
            })
        })
        .collect();

    ok(
        &req.id,
        json!({
            "classes": classes,
            "selectedClass": store.selected_class()
        }),
    )
}

fn classes_create(
    store: &mut WorkspaceStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_text(params, "name")?;
    let section = get_required_text(params, "section")?;
    let class = store.add_class(&name, &section);
    Ok(json!({ "classId": class.id, "class": class }))
}

fn classes_update(
    store: &mut WorkspaceStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let name = get_required_text(params, "name")?;
    let section = get_required_text(params, "section")?;
    let updated = store.update_class(&class_id, &name, &section);
    Ok(json!({ "updated": updated }))
}

fn classes_delete(
    store: &mut WorkspaceStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let summary = store.delete_class(&class_id);
    Ok(json!({
        "removed": summary.removed,
        "studentsRemoved": summary.dependents_removed
    }))
}

fn classes_select(
    store: &mut WorkspaceStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_optional_str(params, "classId")?;
    store.select_class(class_id);
    Ok(json!({
        "selectedClass": store.selected_class(),
        "studentCount": store.filtered_students().len()
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        "classes.create" => Some(with_store_mut(state, req, classes_create)),
        "classes.update" => Some(with_store_mut(state, req, classes_update)),
        "classes.delete" => Some(with_store_mut(state, req, classes_delete)),
        "classes.select" => Some(with_store_mut(state, req, classes_select)),
        _ => None,
    }
}
