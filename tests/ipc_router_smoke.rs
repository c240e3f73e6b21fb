mod test_support;

use serde_json::json;
use std::io::Write;
use test_support::{read_response, request, shutdown, spawn_gradebook, temp_dir};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("gradebook-router-smoke");
    let (child, mut stdin, mut reader) = spawn_gradebook(&workspace);

    let calls: Vec<(&str, serde_json::Value)> = vec![
        ("health", json!({})),
        ("groups.create", json!({ "name": "IS-21" })),
        ("subjects.create", json!({ "name": "Math" })),
        ("students.create", json!({ "name": "Ann", "groupId": 1 })),
        ("grades.create", json!({ "studentId": 1, "subjectId": 1, "value": 4 })),
        ("groups.list", json!({})),
        ("subjects.list", json!({})),
        ("students.list", json!({})),
        ("grades.list", json!({})),
        ("students.listDetailed", json!({})),
        ("students.search", json!({ "group": "all", "name": "an" })),
        ("groups.update", json!({ "groupId": 1, "name": "IS-22" })),
        ("subjects.update", json!({ "subjectId": 1, "name": "Algebra" })),
        ("students.update", json!({ "studentId": 1, "name": "Anna" })),
        ("grades.update", json!({ "gradeId": 1, "value": 5 })),
        ("reports.studentAverages", json!({})),
        ("reports.subjectAverages", json!({})),
        ("reports.subjectDetail", json!({ "subjectId": 1 })),
        ("reports.rankedCount", json!({})),
        ("reports.topN", json!({ "n": 1 })),
        ("reports.retakes", json!({})),
        ("journal.matrix", json!({})),
        ("journal.bySubject", json!({ "subjectId": 1 })),
        ("journal.byStudent", json!({ "studentId": 1 })),
        ("export.csv", json!({})),
        ("store.save", json!({})),
        ("grades.delete", json!({ "gradeId": 1 })),
        ("students.delete", json!({ "studentId": 1 })),
        ("subjects.delete", json!({ "subjectId": 1 })),
        ("groups.delete", json!({ "groupId": 1 })),
    ];

    for (i, (method, params)) in calls.into_iter().enumerate() {
        let resp = request(&mut stdin, &mut reader, &i.to_string(), method, params);
        assert_eq!(
            resp.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            resp
        );
    }

    let unknown = request(&mut stdin, &mut reader, "u", "classes.list", json!({}));
    assert_eq!(unknown["error"]["code"], "not_implemented");

    writeln!(stdin, "{{not json").expect("write");
    stdin.flush().expect("flush");
    let bad = read_response(&mut reader);
    assert_eq!(bad["ok"], false);
    assert_eq!(bad["error"]["code"], "bad_json");
    assert!(bad.get("id").is_none());

    // the process keeps serving after a bad line
    let health = request(&mut stdin, &mut reader, "h", "health", json!({}));
    assert_eq!(health["result"]["counts"]["students"], 0);

    shutdown(child, stdin);
}
