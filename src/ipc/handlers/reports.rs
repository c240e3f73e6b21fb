use crate::calc;
use crate::ipc::helpers::{get_required_i64, get_required_id, report_value, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::reports;
use serde_json::{json, Value};

fn student_averages(state: &AppState) -> Result<Value, HandlerErr> {
    let mut result = report_value(&reports::student_averages(&state.store));
    result["classAverage"] = json!(calc::class_average(&state.store));
    Ok(result)
}

fn subject_detail(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let subject_id = get_required_id(params, "subjectId")?;
    Ok(report_value(&reports::subject_detail(&state.store, subject_id)?))
}

fn top_n(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let n = get_required_i64(params, "n")?;
    let n = usize::try_from(n)
        .map_err(|_| HandlerErr::bad_params("n must be a positive integer"))?;
    let mut result = report_value(&reports::top_n(&state.store, n)?);
    result["rankedCount"] = json!(reports::ranked_count(&state.store));
    Ok(result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "reports.studentAverages" => student_averages(state),
        "reports.subjectAverages" => Ok(report_value(&reports::subject_averages(&state.store))),
        "reports.subjectDetail" => subject_detail(state, &req.params),
        "reports.topN" => top_n(state, &req.params),
        "reports.rankedCount" => Ok(json!({ "rankedCount": reports::ranked_count(&state.store) })),
        "reports.retakes" => Ok(report_value(&reports::retakes(&state.store))),
        _ => return None,
    };
    Some(respond(req, result))
}
