use crate::ipc::helpers::{
    autosave, get_required_id, get_required_str, report_value, respond, unchanged, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::reports;
use serde_json::{json, Value};

fn subjects_list(state: &AppState) -> Result<Value, HandlerErr> {
    let mut result = report_value(&reports::subjects_list(&state.store));
    result["subjects"] = json!(state.store.subjects());
    Ok(result)
}

fn subjects_create(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let subject_id = state.store.create_subject(name)?;
    tracing::info!(subject_id, "subject created");
    Ok(autosave(state, json!({ "subjectId": subject_id })))
}

fn subjects_update(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let subject_id = get_required_id(params, "subjectId")?;
    let name = get_required_str(params, "name")?;
    if !state.store.rename_subject(subject_id, name)? {
        return Ok(unchanged());
    }
    Ok(autosave(state, json!({ "changed": true })))
}

fn subjects_delete(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let subject_id = get_required_id(params, "subjectId")?;
    let cascade = state.store.delete_subject(subject_id)?;
    tracing::info!(subject_id, grades = cascade.grades_removed, "subject deleted");
    Ok(autosave(
        state,
        json!({ "gradesRemoved": cascade.grades_removed }),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "subjects.list" => subjects_list(state),
        "subjects.create" => subjects_create(state, &req.params),
        "subjects.update" => subjects_update(state, &req.params),
        "subjects.delete" => subjects_delete(state, &req.params),
        _ => return None,
    };
    Some(respond(req, result))
}
