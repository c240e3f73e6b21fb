use crate::model::DataStore;
use std::collections::BTreeMap;

/// Placeholder shown wherever an average or history has no data.
pub const NO_VALUE: &str = "none";

/// Next attempt number for a (student, subject) pair: one past the highest
/// existing attempt, or 1. Gaps left by deleted grades are never refilled.
pub fn next_attempt(store: &DataStore, student_id: i64, subject_id: i64) -> i64 {
    store
        .grades()
        .iter()
        .filter(|g| g.student_id == student_id && g.subject_id == subject_id)
        .map(|g| g.attempt + 1)
        .fold(1, i64::max)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubjectAggregate {
    pub sum: i64,
    pub count: usize,
    pub latest_grade_id: i64,
    pub latest_value: i64,
    pub latest_attempt: i64,
}

impl SubjectAggregate {
    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.sum as f64 / self.count as f64)
    }
}

/// One student's grades grouped by subject id. "Latest" is the grade with
/// the highest grade id, regardless of attempt number.
pub fn subject_aggregates_for_student(
    store: &DataStore,
    student_id: i64,
) -> BTreeMap<i64, SubjectAggregate> {
    let mut out: BTreeMap<i64, SubjectAggregate> = BTreeMap::new();
    for grade in store.grades().iter().filter(|g| g.student_id == student_id) {
        let agg = out.entry(grade.subject_id).or_default();
        agg.sum += grade.value;
        agg.count += 1;
        if grade.id > agg.latest_grade_id {
            agg.latest_grade_id = grade.id;
            agg.latest_value = grade.value;
            agg.latest_attempt = grade.attempt;
        }
    }
    out
}

/// Mean of the student's per-subject means, so every subject weighs the
/// same however many attempts it has. `None` when nothing is graded.
pub fn student_average(store: &DataStore, student_id: i64) -> Option<f64> {
    average_of_subject_means(&subject_aggregates_for_student(store, student_id))
}

pub fn average_of_subject_means(aggregates: &BTreeMap<i64, SubjectAggregate>) -> Option<f64> {
    let means: Vec<f64> = aggregates.values().filter_map(|a| a.average()).collect();
    if means.is_empty() {
        return None;
    }
    Some(means.iter().sum::<f64>() / means.len() as f64)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubjectStats {
    pub average: Option<f64>,
    pub count: usize,
}

/// Flat average over every grade row of the subject, all students and attempts.
pub fn subject_stats(store: &DataStore, subject_id: i64) -> SubjectStats {
    let values: Vec<i64> = store
        .grades()
        .iter()
        .filter(|g| g.subject_id == subject_id)
        .map(|g| g.value)
        .collect();
    SubjectStats {
        average: mean(&values),
        count: values.len(),
    }
}

/// Mean of the defined student averages; students without grades are skipped.
pub fn class_average(store: &DataStore) -> Option<f64> {
    let avgs: Vec<f64> = store
        .students()
        .iter()
        .filter_map(|s| student_average(store, s.id))
        .collect();
    if avgs.is_empty() {
        return None;
    }
    Some(avgs.iter().sum::<f64>() / avgs.len() as f64)
}

/// Grade values for one pair, ordered by attempt.
pub fn attempt_history(store: &DataStore, student_id: i64, subject_id: i64) -> Vec<i64> {
    let mut grades: Vec<_> = store
        .grades()
        .iter()
        .filter(|g| g.student_id == student_id && g.subject_id == subject_id)
        .collect();
    grades.sort_by_key(|g| (g.attempt, g.id));
    grades.into_iter().map(|g| g.value).collect()
}

/// Per-pair detail used by journals and the detailed listing.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptSummary {
    pub values: Vec<i64>,
    pub average: Option<f64>,
    pub latest: Option<i64>,
}

impl AttemptSummary {
    pub fn attempts(&self) -> usize {
        self.values.len()
    }
}

pub fn attempt_summary(store: &DataStore, student_id: i64, subject_id: i64) -> AttemptSummary {
    let values = attempt_history(store, student_id, subject_id);
    let latest = store
        .grades()
        .iter()
        .filter(|g| g.student_id == student_id && g.subject_id == subject_id)
        .max_by_key(|g| g.id)
        .map(|g| g.value);
    AttemptSummary {
        average: mean(&values),
        latest,
        values,
    }
}

pub fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<i64>() as f64 / values.len() as f64)
}

pub fn format_avg(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => NO_VALUE.to_string(),
    }
}

pub fn join_values(values: &[i64]) -> String {
    if values.is_empty() {
        return NO_VALUE.to_string();
    }
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
