use crate::filter::{GroupFilter, SortKey, SortOrder};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::{StoreError, MAX_GRADE};
use crate::table::Report;
use serde_json::{json, Value};

#[derive(Debug)]
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<StoreError> for HandlerErr {
    fn from(e: StoreError) -> Self {
        let details = match &e {
            StoreError::NotFound { kind, id } | StoreError::Integrity { kind, id } => {
                Some(json!({ "entity": kind.to_string(), "id": id }))
            }
            StoreError::Validation(_) => None,
        };
        Self {
            code: e.code(),
            message: e.to_string(),
            details,
        }
    }
}

pub fn respond(req: &Request, result: Result<Value, HandlerErr>) -> Value {
    match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    }
}

pub fn get_required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_optional_str<'a>(params: &'a Value, key: &str) -> Result<Option<&'a str>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_str()
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a string", key))),
    }
}

pub fn get_required_i64(params: &Value, key: &str) -> Result<i64, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Err(HandlerErr::bad_params(format!("missing {}", key))),
        Some(v) => v
            .as_i64()
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be an integer", key))),
    }
}

fn check_id(key: &str, id: i64) -> Result<i64, HandlerErr> {
    if id <= 0 {
        return Err(HandlerErr::bad_params(format!(
            "{} must be a positive integer",
            key
        )));
    }
    Ok(id)
}

pub fn get_required_id(params: &Value, key: &str) -> Result<i64, HandlerErr> {
    check_id(key, get_required_i64(params, key)?)
}

/// Absent and `null` both mean "no id".
pub fn get_optional_id(params: &Value, key: &str) -> Result<Option<i64>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => get_required_id(params, key).map(Some),
    }
}

pub fn get_min_average(params: &Value, key: &str) -> Result<Option<f64>, HandlerErr> {
    let raw = match params.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(v) => v
            .as_f64()
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a number", key)))?,
    };
    if !(0.0..=MAX_GRADE as f64).contains(&raw) {
        return Err(HandlerErr::bad_params(format!(
            "{} must be between 0 and {}",
            key, MAX_GRADE
        )));
    }
    Ok(Some(raw))
}

/// `"all"` (or absent), `"ungrouped"`, or a group id.
pub fn get_group_filter(params: &Value, key: &str) -> Result<GroupFilter, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(GroupFilter::All),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(GroupFilter::All),
            "ungrouped" => Ok(GroupFilter::Ungrouped),
            other => Err(HandlerErr::bad_params(format!(
                "unknown group filter: {}",
                other
            ))),
        },
        Some(_) => Ok(GroupFilter::Group(get_required_id(params, key)?)),
    }
}

pub fn get_sort_key(params: &Value, key: &str) -> Result<SortKey, HandlerErr> {
    match get_optional_str(params, key)? {
        None | Some("id") => Ok(SortKey::Id),
        Some("name") => Ok(SortKey::Name),
        Some("average") => Ok(SortKey::Average),
        Some(other) => Err(HandlerErr::bad_params(format!("unknown sort key: {}", other))),
    }
}

pub fn get_sort_order(params: &Value, key: &str) -> Result<SortOrder, HandlerErr> {
    match get_optional_str(params, key)? {
        None | Some("asc") => Ok(SortOrder::Asc),
        Some("desc") => Ok(SortOrder::Desc),
        Some(other) => Err(HandlerErr::bad_params(format!(
            "unknown sort order: {}",
            other
        ))),
    }
}

pub fn report_value(report: &Report) -> Value {
    json!({
        "report": report,
        "lines": report.render_lines(),
    })
}

/// Persists the whole store after a mutation. A failed save is reported in
/// the result; the in-memory change stands either way.
pub fn autosave(state: &AppState, mut result: Value) -> Value {
    match state.save() {
        Ok(()) => {
            result["saved"] = json!(true);
        }
        Err(e) => {
            tracing::warn!(path = %state.db_path.display(), "autosave failed: {e:#}");
            result["saved"] = json!(false);
            result["warning"] = json!(format!(
                "changes are kept in memory but were not saved: {e:#}"
            ));
        }
    }
    result
}

/// Result of an edit that matched the current state; nothing is saved.
pub fn unchanged() -> Value {
    json!({ "changed": false, "saved": false })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_filter_accepts_keywords_and_ids() {
        let p = json!({ "a": "all", "u": "Ungrouped", "g": 3, "bad": "x", "zero": 0 });
        assert_eq!(get_group_filter(&p, "a").unwrap(), GroupFilter::All);
        assert_eq!(get_group_filter(&p, "missing").unwrap(), GroupFilter::All);
        assert_eq!(get_group_filter(&p, "u").unwrap(), GroupFilter::Ungrouped);
        assert_eq!(get_group_filter(&p, "g").unwrap(), GroupFilter::Group(3));
        assert!(get_group_filter(&p, "bad").is_err());
        assert!(get_group_filter(&p, "zero").is_err());
    }

    #[test]
    fn ids_must_be_positive_integers() {
        let p = json!({ "a": 5, "b": -1, "c": "5", "d": null });
        assert_eq!(get_required_id(&p, "a").unwrap(), 5);
        assert_eq!(get_required_id(&p, "b").unwrap_err().code, "bad_params");
        assert!(get_required_id(&p, "c").is_err());
        assert!(get_required_id(&p, "d").is_err());
        assert_eq!(get_optional_id(&p, "d").unwrap(), None);
        assert_eq!(get_optional_id(&p, "nope").unwrap(), None);
    }

    #[test]
    fn min_average_range() {
        let p = json!({ "ok": 4.5, "low": -0.1, "high": 5.5 });
        assert_eq!(get_min_average(&p, "ok").unwrap(), Some(4.5));
        assert_eq!(get_min_average(&p, "none").unwrap(), None);
        assert!(get_min_average(&p, "low").is_err());
        assert!(get_min_average(&p, "high").is_err());
    }

    #[test]
    fn store_errors_keep_their_code() {
        let e: HandlerErr = StoreError::NotFound {
            kind: crate::model::EntityKind::Student,
            id: 9,
        }
        .into();
        assert_eq!(e.code, "not_found");
        assert_eq!(e.details, Some(json!({ "entity": "student", "id": 9 })));
    }
}
