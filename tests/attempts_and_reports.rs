mod test_support;

use serde_json::json;
use test_support::{lines, request_err, request_ok, shutdown, spawn_gradebook, table_rows, temp_dir};

#[test]
fn attempts_count_up_per_pair_and_averages_use_subject_means() {
    let workspace = temp_dir("gradebook-attempts");
    let (child, mut stdin, mut reader) = spawn_gradebook(&workspace);
    let mut n = 0;
    let mut call = |method: &str, params: serde_json::Value| {
        n += 1;
        request_ok(&mut stdin, &mut reader, &n.to_string(), method, params)
    };

    call("subjects.create", json!({ "name": "A" }));
    call("subjects.create", json!({ "name": "B" }));
    call("students.create", json!({ "name": "S" }));
    call("students.create", json!({ "name": "T" }));

    let first = call("grades.create", json!({ "studentId": 1, "subjectId": 1, "value": 2 }));
    let other = call("grades.create", json!({ "studentId": 1, "subjectId": 2, "value": 5 }));
    let second = call("grades.create", json!({ "studentId": 1, "subjectId": 1, "value": 4 }));
    assert_eq!(first["attempt"], 1);
    assert_eq!(other["attempt"], 1);
    assert_eq!(second["attempt"], 2);
    assert_eq!(second["gradeId"], 3);

    let averages = call("reports.studentAverages", json!({}));
    let rows = table_rows(&averages);
    assert_eq!(rows[0][3], "4.00");
    assert_eq!(rows[1][3], "none");
    assert_eq!(averages["classAverage"], 4.0);

    let subjects = call("reports.subjectAverages", json!({}));
    let rows = table_rows(&subjects);
    assert_eq!(rows[0], vec!["1", "A", "3.00", "2"]);
    assert_eq!(rows[1], vec!["2", "B", "5.00", "1"]);

    // editing a value keeps the attempt number
    let edited = call("grades.update", json!({ "gradeId": 1, "value": 1 }));
    assert_eq!(edited["changed"], true);
    let same = call("grades.update", json!({ "gradeId": 1, "value": 1 }));
    assert_eq!(same["changed"], false);

    call("grades.create", json!({ "studentId": 2, "subjectId": 2, "value": 2 }));
    let retakes = call("reports.retakes", json!({}));
    assert_eq!(table_rows(&retakes), vec![vec!["T", "B", "1", "2"]]);

    assert_eq!(call("reports.rankedCount", json!({}))["rankedCount"], 2);
    let top = call("reports.topN", json!({ "n": 2 }));
    assert_eq!(top["rankedCount"], 2);
    let rows = table_rows(&top);
    assert_eq!(rows[0][1], "S");
    assert_eq!(rows[1][1], "T");

    let detail = call("reports.subjectDetail", json!({ "subjectId": 1 }));
    assert_eq!(table_rows(&detail), vec![vec!["S", "2.50", "4", "1, 4"]]);
    assert_eq!(lines(&detail)[0], "Subject detail: A");

    drop(call);
    for (id, method, params, code) in [
        ("e1", "grades.create", json!({ "studentId": 1, "subjectId": 1, "value": 6 }), "bad_params"),
        ("e2", "grades.create", json!({ "studentId": 9, "subjectId": 1, "value": 3 }), "integrity_violation"),
        ("e3", "reports.topN", json!({ "n": 3 }), "bad_params"),
        ("e4", "grades.update", json!({ "gradeId": 99, "value": 3 }), "not_found"),
    ] {
        assert_eq!(request_err(&mut stdin, &mut reader, id, method, params), code);
    }

    shutdown(child, stdin);
}
