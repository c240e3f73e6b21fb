use crate::export;
use crate::ipc::helpers::{get_optional_str, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};
use std::path::PathBuf;

fn export_csv(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let dir = get_optional_str(params, "dir")?
        .map(PathBuf::from)
        .unwrap_or_else(|| state.export_dir.clone());
    let summary = export::export_csv(&state.store, &dir).map_err(|e| {
        tracing::warn!(dir = %dir.display(), "export failed: {e:#}");
        HandlerErr {
            code: "export_failed",
            message: format!("{e:#}"),
            details: Some(json!({ "dir": dir.to_string_lossy() })),
        }
    })?;
    Ok(json!(summary))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "export.csv" => Some(respond(req, export_csv(state, &req.params))),
        _ => None,
    }
}
