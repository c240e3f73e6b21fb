use crate::filter::{self, StudentQuery};
use crate::ipc::helpers::{
    autosave, get_group_filter, get_min_average, get_optional_id, get_optional_str,
    get_required_id, get_required_str, get_sort_key, get_sort_order, report_value, respond,
    unchanged, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::StudentEdit;
use crate::reports;
use serde_json::{json, Value};

fn students_list(state: &AppState) -> Result<Value, HandlerErr> {
    let mut result = report_value(&reports::students_list(&state.store));
    result["students"] = json!(state.store.students());
    Ok(result)
}

fn students_list_detailed(state: &AppState) -> Result<Value, HandlerErr> {
    Ok(report_value(&reports::students_detailed(&state.store)))
}

fn students_create(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let group_id = get_optional_id(params, "groupId")?;
    let student_id = state.store.create_student(name, group_id)?;
    tracing::info!(student_id, ?group_id, "student created");
    Ok(autosave(state, json!({ "studentId": student_id })))
}

fn students_update(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_id(params, "studentId")?;
    let edit = StudentEdit {
        name: get_optional_str(params, "name")?.map(str::to_string),
        // present-but-null clears the group, absent leaves it alone
        group: match params.get("groupId") {
            None => None,
            Some(_) => Some(get_optional_id(params, "groupId")?),
        },
    };
    if !state.store.edit_student(student_id, edit)? {
        return Ok(unchanged());
    }
    Ok(autosave(state, json!({ "changed": true })))
}

fn students_delete(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_id(params, "studentId")?;
    let cascade = state.store.delete_student(student_id)?;
    tracing::info!(student_id, grades = cascade.grades_removed, "student deleted");
    Ok(autosave(
        state,
        json!({ "gradesRemoved": cascade.grades_removed }),
    ))
}

fn students_search(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let query = StudentQuery {
        group: get_group_filter(params, "group")?,
        name: get_optional_str(params, "name")?.unwrap_or("").to_string(),
        min_average: get_min_average(params, "minAverage")?,
    };
    let sort_key = get_sort_key(params, "sortKey")?;
    let sort_order = get_sort_order(params, "sortOrder")?;

    let mut results = filter::filter_students(&state.store, &query);
    filter::sort_results(&mut results, sort_key, sort_order);

    let rows: Vec<Value> = results
        .iter()
        .map(|r| {
            json!({
                "id": r.student.id,
                "name": r.student.name,
                "groupId": r.student.group_id,
                "group": state.store.group_label(r.student.group_id),
                "average": r.average,
            })
        })
        .collect();
    let mut result = report_value(&reports::search_results(&state.store, &results));
    result["students"] = json!(rows);
    Ok(result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "students.list" => students_list(state),
        "students.listDetailed" => students_list_detailed(state),
        "students.create" => students_create(state, &req.params),
        "students.update" => students_update(state, &req.params),
        "students.delete" => students_delete(state, &req.params),
        "students.search" => students_search(state, &req.params),
        _ => return None,
    };
    Some(respond(req, result))
}
