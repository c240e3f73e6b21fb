use crate::ipc::helpers::{
    autosave, get_required_i64, get_required_id, report_value, respond, unchanged, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::reports;
use serde_json::{json, Value};

fn grades_list(state: &AppState) -> Result<Value, HandlerErr> {
    let mut result = report_value(&reports::grades_list(&state.store));
    result["grades"] = json!(state.store.grades());
    Ok(result)
}

fn grades_create(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_id(params, "studentId")?;
    let subject_id = get_required_id(params, "subjectId")?;
    let value = get_required_i64(params, "value")?;
    let grade = state.store.create_grade(student_id, subject_id, value)?;
    tracing::info!(
        grade_id = grade.id,
        student_id,
        subject_id,
        attempt = grade.attempt,
        "grade created"
    );
    Ok(autosave(
        state,
        json!({ "gradeId": grade.id, "attempt": grade.attempt }),
    ))
}

fn grades_update(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let grade_id = get_required_id(params, "gradeId")?;
    let value = get_required_i64(params, "value")?;
    if !state.store.set_grade_value(grade_id, value)? {
        return Ok(unchanged());
    }
    Ok(autosave(state, json!({ "changed": true })))
}

fn grades_delete(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let grade_id = get_required_id(params, "gradeId")?;
    let removed = state.store.delete_grade(grade_id)?;
    tracing::info!(grade_id, attempt = removed.attempt, "grade deleted");
    Ok(autosave(state, json!({ "gradeId": removed.id })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "grades.list" => grades_list(state),
        "grades.create" => grades_create(state, &req.params),
        "grades.update" => grades_update(state, &req.params),
        "grades.delete" => grades_delete(state, &req.params),
        _ => return None,
    };
    Some(respond(req, result))
}
