use crate::ipc::helpers::{get_group_filter, get_required_id, report_value, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::journal;
use serde_json::Value;

fn matrix(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let group = get_group_filter(params, "group")?;
    Ok(report_value(&journal::matrix(&state.store, group)))
}

fn by_subject(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let subject_id = get_required_id(params, "subjectId")?;
    let group = get_group_filter(params, "group")?;
    Ok(report_value(&journal::by_subject(
        &state.store,
        subject_id,
        group,
    )?))
}

fn by_student(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_id(params, "studentId")?;
    Ok(report_value(&journal::by_student(&state.store, student_id)?))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "journal.matrix" => matrix(state, &req.params),
        "journal.bySubject" => by_subject(state, &req.params),
        "journal.byStudent" => by_student(state, &req.params),
        _ => return None,
    };
    Some(respond(req, result))
}
