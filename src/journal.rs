use crate::calc;
use crate::filter::{self, GroupFilter};
use crate::model::{DataStore, EntityKind, StoreError};
use crate::table::{Column, Report, Table};

const EMPTY_CELL: &str = "-";

fn group_heading(store: &DataStore, group: GroupFilter) -> Option<String> {
    match group {
        GroupFilter::All => None,
        GroupFilter::Ungrouped => Some("Group: no group".to_string()),
        GroupFilter::Group(id) => Some(format!("Group: {}", store.group_label(Some(id)))),
    }
}

/// Student x subject grid of latest grades with each student's overall
/// average in the last column.
pub fn matrix(store: &DataStore, group: GroupFilter) -> Report {
    if store.students().is_empty() {
        return Report::notice("No students.");
    }
    if store.subjects().is_empty() {
        return Report::notice("No subjects.");
    }
    let students = filter::students_for_group_sorted(store, group);
    if students.is_empty() {
        return Report::notice("No students for the selected filter.");
    }

    let mut columns = vec![
        Column::right("ID", 4),
        Column::left("Name", 24),
        Column::left("Group", 18),
    ];
    columns.extend(store.subjects().iter().map(|s| Column::right(&s.name, 8)));
    columns.push(Column::right("Average", 10));
    let mut table = Table::new(columns);

    for student in students {
        let aggregates = calc::subject_aggregates_for_student(store, student.id);
        let mut row = vec![
            student.id.to_string(),
            student.name.clone(),
            store.group_label(student.group_id),
        ];
        for subject in store.subjects() {
            row.push(match aggregates.get(&subject.id) {
                Some(agg) if agg.count > 0 => agg.latest_value.to_string(),
                _ => EMPTY_CELL.to_string(),
            });
        }
        row.push(calc::format_avg(calc::average_of_subject_means(&aggregates)));
        table.push_row(row);
    }

    let mut report = Report::notice("Journal (latest grades):");
    if let Some(line) = group_heading(store, group) {
        report.text(line);
    }
    report.table(table);
    report
}

/// Full attempt history of one subject, one row per student.
pub fn by_subject(
    store: &DataStore,
    subject_id: i64,
    group: GroupFilter,
) -> Result<Report, StoreError> {
    let subject = store.find_subject(subject_id).ok_or(StoreError::NotFound {
        kind: EntityKind::Subject,
        id: subject_id,
    })?;
    if store.students().is_empty() {
        return Ok(Report::notice("No students."));
    }
    let students = filter::students_for_group_sorted(store, group);
    if students.is_empty() {
        return Ok(Report::notice("No students for the selected filter."));
    }

    let mut table = Table::new(vec![
        Column::right("ID", 4),
        Column::left("Name", 24),
        Column::left("Group", 18),
        Column::left("Grades", 24),
        Column::right("Average", 10),
        Column::right("Latest", 10),
        Column::right("Attempts", 8),
    ]);
    for student in students {
        let summary = calc::attempt_summary(store, student.id, subject_id);
        table.push_row(vec![
            student.id.to_string(),
            student.name.clone(),
            store.group_label(student.group_id),
            calc::join_values(&summary.values),
            calc::format_avg(summary.average),
            latest_text(summary.latest),
            summary.attempts().to_string(),
        ]);
    }

    let mut report = Report::notice(format!("Journal for subject: {}", subject.name));
    if let Some(line) = group_heading(store, group) {
        report.text(line);
    }
    report.table(table);
    Ok(report)
}

/// Every subject for one student plus the overall average as a summary line.
pub fn by_student(store: &DataStore, student_id: i64) -> Result<Report, StoreError> {
    let student = store.find_student(student_id).ok_or(StoreError::NotFound {
        kind: EntityKind::Student,
        id: student_id,
    })?;
    if store.subjects().is_empty() {
        return Ok(Report::notice("No subjects."));
    }

    let mut table = Table::new(vec![
        Column::right("ID", 4),
        Column::left("Subject", 26),
        Column::left("Grades", 24),
        Column::right("Average", 10),
        Column::right("Latest", 10),
        Column::right("Attempts", 8),
    ]);
    for subject in store.subjects() {
        let summary = calc::attempt_summary(store, student_id, subject.id);
        table.push_row(vec![
            subject.id.to_string(),
            subject.name.clone(),
            calc::join_values(&summary.values),
            calc::format_avg(summary.average),
            latest_text(summary.latest),
            summary.attempts().to_string(),
        ]);
    }

    let mut report = Report::notice(format!("Journal for student: {}", student.name));
    report
        .text(format!("Group: {}", store.group_label(student.group_id)))
        .table(table)
        .text(format!(
            "Average across subjects: {}",
            calc::format_avg(calc::student_average(store, student_id))
        ));
    Ok(report)
}

fn latest_text(latest: Option<i64>) -> String {
    latest
        .map(|v| v.to_string())
        .unwrap_or_else(|| calc::NO_VALUE.to_string())
}
