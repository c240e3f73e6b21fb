use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "dbPath": state.db_path.to_string_lossy(),
            "exportDir": state.export_dir.to_string_lossy(),
            "savingDisabled": state.save_blocked.is_some(),
            "counts": {
                "groups": state.store.groups().len(),
                "subjects": state.store.subjects().len(),
                "students": state.store.students().len(),
                "grades": state.store.grades().len(),
            }
        }),
    )
}

fn handle_store_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.save() {
        Ok(()) => {
            tracing::info!(path = %state.db_path.display(), "store saved");
            ok(
                &req.id,
                json!({ "saved": true, "dbPath": state.db_path.to_string_lossy() }),
            )
        }
        Err(e) => {
            tracing::warn!(path = %state.db_path.display(), "save failed: {e:#}");
            err(&req.id, "save_failed", format!("{e:#}"), None)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "store.save" => Some(handle_store_save(state, req)),
        _ => None,
    }
}
