use crate::calc;
use crate::model::{DataStore, Student};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GroupFilter {
    #[default]
    All,
    Ungrouped,
    Group(i64),
}

impl GroupFilter {
    pub fn matches(self, student: &Student) -> bool {
        match self {
            GroupFilter::All => true,
            GroupFilter::Ungrouped => student.group_id.is_none(),
            GroupFilter::Group(id) => student.group_id == Some(id),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Id,
    Name,
    Average,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Conjunctive student filter. An empty `name` matches everyone.
#[derive(Debug, Clone, Default)]
pub struct StudentQuery {
    pub group: GroupFilter,
    pub name: String,
    pub min_average: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct StudentResult<'a> {
    pub student: &'a Student,
    pub average: Option<f64>,
}

fn fold_ascii(name: &str) -> String {
    name.to_ascii_lowercase()
}

pub fn filter_students<'a>(store: &'a DataStore, query: &StudentQuery) -> Vec<StudentResult<'a>> {
    let needle = query.name.trim().to_lowercase();
    store
        .students()
        .iter()
        .filter(|s| query.group.matches(s))
        .filter(|s| needle.is_empty() || s.name.to_lowercase().contains(&needle))
        .map(|s| StudentResult {
            student: s,
            average: calc::student_average(store, s.id),
        })
        .filter(|r| match query.min_average {
            // an undefined average never passes a threshold
            Some(min) => r.average.is_some_and(|avg| avg >= min),
            None => true,
        })
        .collect()
}

fn cmp_average(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.total_cmp(&y),
    }
}

fn cmp_ascending(key: SortKey, a: &StudentResult<'_>, b: &StudentResult<'_>) -> Ordering {
    let primary = match key {
        SortKey::Id => Ordering::Equal,
        SortKey::Name => fold_ascii(&a.student.name).cmp(&fold_ascii(&b.student.name)),
        SortKey::Average => cmp_average(a.average, b.average),
    };
    primary.then(a.student.id.cmp(&b.student.id))
}

/// Total order: the student id always breaks ties, so equal inputs sort
/// identically every time.
pub fn sort_results(results: &mut [StudentResult<'_>], key: SortKey, order: SortOrder) {
    results.sort_by(|a, b| match order {
        SortOrder::Asc => cmp_ascending(key, a, b),
        SortOrder::Desc => cmp_ascending(key, b, a),
    });
}

/// Students matching `group`, ordered by folded name then id.
pub fn students_for_group_sorted(store: &DataStore, group: GroupFilter) -> Vec<&Student> {
    let mut out: Vec<&Student> = store
        .students()
        .iter()
        .filter(|s| group.matches(s))
        .collect();
    out.sort_by(|a, b| {
        fold_ascii(&a.name)
            .cmp(&fold_ascii(&b.name))
            .then(a.id.cmp(&b.id))
    });
    out
}

/// Students with a defined average, best first; ties go to the lower id.
pub fn ranking(store: &DataStore) -> Vec<StudentResult<'_>> {
    let mut out: Vec<StudentResult<'_>> = filter_students(store, &StudentQuery::default())
        .into_iter()
        .filter(|r| r.average.is_some())
        .collect();
    out.sort_by(|a, b| {
        cmp_average(b.average, a.average).then(a.student.id.cmp(&b.student.id))
    });
    out
}
