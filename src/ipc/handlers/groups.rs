use crate::ipc::helpers::{
    autosave, get_required_id, get_required_str, report_value, respond, unchanged, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::reports;
use serde_json::{json, Value};

fn groups_list(state: &AppState) -> Result<Value, HandlerErr> {
    let mut result = report_value(&reports::groups_list(&state.store));
    result["groups"] = json!(state.store.groups());
    Ok(result)
}

fn groups_create(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let group_id = state.store.create_group(name)?;
    tracing::info!(group_id, "group created");
    Ok(autosave(state, json!({ "groupId": group_id })))
}

fn groups_update(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let group_id = get_required_id(params, "groupId")?;
    let name = get_required_str(params, "name")?;
    if !state.store.rename_group(group_id, name)? {
        return Ok(unchanged());
    }
    Ok(autosave(state, json!({ "changed": true })))
}

fn groups_delete(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let group_id = get_required_id(params, "groupId")?;
    let cascade = state.store.delete_group(group_id)?;
    tracing::info!(group_id, students = cascade.students_updated, "group deleted");
    Ok(autosave(
        state,
        json!({ "studentsUpdated": cascade.students_updated }),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "groups.list" => groups_list(state),
        "groups.create" => groups_create(state, &req.params),
        "groups.update" => groups_update(state, &req.params),
        "groups.delete" => groups_delete(state, &req.params),
        _ => return None,
    };
    Some(respond(req, result))
}
