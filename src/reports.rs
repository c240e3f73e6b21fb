use crate::calc;
use crate::filter::{self, StudentResult};
use crate::model::{DataStore, EntityKind, StoreError, PASS_GRADE};
use crate::table::{Column, Report, Table};

fn student_columns(first: &str, first_width: usize) -> Vec<Column> {
    vec![
        Column::right(first, first_width),
        Column::left("Name", 28),
        Column::left("Group", 20),
        Column::right("Average", 12),
    ]
}

pub fn groups_list(store: &DataStore) -> Report {
    if store.groups().is_empty() {
        return Report::notice("No groups.");
    }
    let mut table = Table::new(vec![Column::right("ID", 4), Column::left("Name", 28)]);
    for g in store.groups() {
        table.push_row(vec![g.id.to_string(), g.name.clone()]);
    }
    let mut report = Report::notice("Groups:");
    report.table(table);
    report
}

pub fn subjects_list(store: &DataStore) -> Report {
    if store.subjects().is_empty() {
        return Report::notice("No subjects.");
    }
    let mut table = Table::new(vec![Column::right("ID", 4), Column::left("Name", 28)]);
    for s in store.subjects() {
        table.push_row(vec![s.id.to_string(), s.name.clone()]);
    }
    let mut report = Report::notice("Subjects:");
    report.table(table);
    report
}

pub fn students_list(store: &DataStore) -> Report {
    if store.students().is_empty() {
        return Report::notice("No students.");
    }
    let mut table = Table::new(vec![
        Column::right("ID", 4),
        Column::left("Name", 28),
        Column::left("Group", 20),
    ]);
    for s in store.students() {
        table.push_row(vec![
            s.id.to_string(),
            s.name.clone(),
            store.group_label(s.group_id),
        ]);
    }
    let mut report = Report::notice("Students:");
    report.table(table);
    report
}

pub fn grades_list(store: &DataStore) -> Report {
    if store.grades().is_empty() {
        return Report::notice("No grades.");
    }
    let mut table = Table::new(vec![
        Column::right("ID", 4),
        Column::left("Student", 24),
        Column::left("Subject", 24),
        Column::right("Attempt", 8),
        Column::right("Grade", 8),
    ]);
    for g in store.grades() {
        table.push_row(vec![
            g.id.to_string(),
            store.student_label(g.student_id),
            store.subject_label(g.subject_id),
            g.attempt.to_string(),
            g.value.to_string(),
        ]);
    }
    let mut report = Report::notice("Grades:");
    report.table(table);
    report
}

/// Every student with overall average, each followed by a per-subject breakdown.
pub fn students_detailed(store: &DataStore) -> Report {
    if store.students().is_empty() {
        return Report::notice("No students.");
    }
    let mut report = Report::notice("Student list:");
    for student in store.students() {
        let aggregates = calc::subject_aggregates_for_student(store, student.id);
        let mut head = Table::new(student_columns("ID", 4));
        head.push_row(vec![
            student.id.to_string(),
            student.name.clone(),
            store.group_label(student.group_id),
            calc::format_avg(calc::average_of_subject_means(&aggregates)),
        ]);
        report.table(head);

        if aggregates.is_empty() {
            report.text("  Subjects: none");
            continue;
        }
        report.text("  Subjects:");
        let mut subjects = Table::new(vec![
            Column::right("ID", 4),
            Column::left("Subject", 26),
            Column::right("Average", 10),
            Column::right("Latest", 10),
            Column::left("Grades", 30),
        ]);
        for (subject_id, agg) in &aggregates {
            subjects.push_row(vec![
                subject_id.to_string(),
                store.subject_label(*subject_id),
                calc::format_avg(agg.average()),
                agg.latest_value.to_string(),
                calc::join_values(&calc::attempt_history(store, student.id, *subject_id)),
            ]);
        }
        report.table(subjects);
    }
    report
}

pub fn search_results(store: &DataStore, results: &[StudentResult<'_>]) -> Report {
    if results.is_empty() {
        return Report::notice("No matching students.");
    }
    let mut table = Table::new(student_columns("ID", 4));
    for r in results {
        table.push_row(vec![
            r.student.id.to_string(),
            r.student.name.clone(),
            store.group_label(r.student.group_id),
            calc::format_avg(r.average),
        ]);
    }
    let mut report = Report::notice(format!("Results ({}):", results.len()));
    report.table(table);
    report
}

pub fn student_averages(store: &DataStore) -> Report {
    if store.students().is_empty() {
        return Report::notice("No students.");
    }
    let mut table = Table::new(student_columns("ID", 4));
    for s in store.students() {
        table.push_row(vec![
            s.id.to_string(),
            s.name.clone(),
            store.group_label(s.group_id),
            calc::format_avg(calc::student_average(store, s.id)),
        ]);
    }
    let mut report = Report::notice("Student averages (all grades per subject):");
    report.table(table).text(format!(
        "Overall average: {}",
        calc::format_avg(calc::class_average(store))
    ));
    report
}

pub fn subject_averages(store: &DataStore) -> Report {
    if store.subjects().is_empty() {
        return Report::notice("No subjects.");
    }
    let mut table = Table::new(vec![
        Column::right("ID", 4),
        Column::left("Subject", 28),
        Column::right("Average", 12),
        Column::right("Grades", 10),
    ]);
    for s in store.subjects() {
        let stats = calc::subject_stats(store, s.id);
        table.push_row(vec![
            s.id.to_string(),
            s.name.clone(),
            calc::format_avg(stats.average),
            stats.count.to_string(),
        ]);
    }
    let mut report = Report::notice("Subject averages (all grades):");
    report.table(table);
    report
}

/// Students graded in one subject, by student id, with their attempt history.
pub fn subject_detail(store: &DataStore, subject_id: i64) -> Result<Report, StoreError> {
    let subject = store.find_subject(subject_id).ok_or(StoreError::NotFound {
        kind: EntityKind::Subject,
        id: subject_id,
    })?;
    let mut student_ids: Vec<i64> = store
        .grades()
        .iter()
        .filter(|g| g.subject_id == subject_id)
        .map(|g| g.student_id)
        .collect();
    student_ids.sort_unstable();
    student_ids.dedup();
    if student_ids.is_empty() {
        return Ok(Report::notice(format!("No grades for subject {}.", subject.name)));
    }

    let mut table = Table::new(vec![
        Column::left("Student", 28),
        Column::right("Average", 10),
        Column::right("Latest", 10),
        Column::left("Grades", 36),
    ]);
    for student_id in student_ids {
        let summary = calc::attempt_summary(store, student_id, subject_id);
        table.push_row(vec![
            store.student_label(student_id),
            calc::format_avg(summary.average),
            summary.latest.map(|v| v.to_string()).unwrap_or_default(),
            calc::join_values(&summary.values),
        ]);
    }
    let mut report = Report::notice(format!("Subject detail: {}", subject.name));
    report.table(table);
    Ok(report)
}

/// Number of students eligible for the top-N ranking.
pub fn ranked_count(store: &DataStore) -> usize {
    filter::ranking(store).len()
}

pub fn top_n(store: &DataStore, n: usize) -> Result<Report, StoreError> {
    let ranked = filter::ranking(store);
    if ranked.is_empty() {
        return Ok(Report::notice("No grades."));
    }
    if n == 0 || n > ranked.len() {
        return Err(StoreError::Validation(format!(
            "n must be between 1 and {}",
            ranked.len()
        )));
    }
    let mut table = Table::new(student_columns("#", 3));
    for (i, r) in ranked.iter().take(n).enumerate() {
        table.push_row(vec![
            (i + 1).to_string(),
            r.student.name.clone(),
            store.group_label(r.student.group_id),
            calc::format_avg(r.average),
        ]);
    }
    let mut report = Report::notice(format!("Top {} students:", n));
    report.table(table);
    Ok(report)
}

/// Pairs whose latest grade (highest grade id) is below the pass mark.
pub fn retakes(store: &DataStore) -> Report {
    if store.students().is_empty() || store.subjects().is_empty() {
        return Report::notice("No students or subjects.");
    }
    let mut table = Table::new(vec![
        Column::left("Student", 28),
        Column::left("Subject", 28),
        Column::right("Attempt", 8),
        Column::right("Grade", 10),
    ]);
    for student in store.students() {
        for (subject_id, agg) in calc::subject_aggregates_for_student(store, student.id) {
            if agg.latest_value < PASS_GRADE {
                table.push_row(vec![
                    student.name.clone(),
                    store.subject_label(subject_id),
                    agg.latest_attempt.to_string(),
                    agg.latest_value.to_string(),
                ]);
            }
        }
    }
    let mut report = Report::notice(format!("Retakes (latest grade < {}):", PASS_GRADE));
    if table.is_empty() {
        report.text("  None.");
    } else {
        report.table(table);
    }
    report
}
