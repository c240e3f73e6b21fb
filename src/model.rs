use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

pub const MIN_GRADE: i64 = 1;
pub const MAX_GRADE: i64 = 5;
pub const PASS_GRADE: i64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub name: String,
    /// `None` means the student is not in any group.
    pub group_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: i64,
    pub student_id: i64,
    pub subject_id: i64,
    pub value: i64,
    pub attempt: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Group,
    Subject,
    Student,
    Grade,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Group => "group",
            EntityKind::Subject => "subject",
            EntityKind::Student => "student",
            EntityKind::Grade => "grade",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: i64 },
    /// A foreign key points at a record that does not exist.
    #[error("referenced {kind} {id} does not exist")]
    Integrity { kind: EntityKind, id: i64 },
    #[error("{0}")]
    Validation(String),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "not_found",
            StoreError::Integrity { .. } => "integrity_violation",
            StoreError::Validation(_) => "bad_params",
        }
    }
}

/// Dependents touched by a delete. Always reported back to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    pub grades_removed: usize,
    pub students_updated: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGrade {
    pub id: i64,
    pub attempt: i64,
}

/// Fields to change on a student; `None` leaves the field as is.
/// `group: Some(None)` removes the student from its group.
#[derive(Debug, Clone, Default)]
pub struct StudentEdit {
    pub name: Option<String>,
    pub group: Option<Option<i64>>,
}

/// Repairs applied while assembling a store from persisted rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadRepairs {
    pub orphan_grades_dropped: usize,
    pub students_ungrouped: usize,
}

#[derive(Debug, Clone)]
pub struct DataStore {
    groups: Vec<Group>,
    subjects: Vec<Subject>,
    students: Vec<Student>,
    grades: Vec<Grade>,
    next_group_id: i64,
    next_subject_id: i64,
    next_student_id: i64,
    next_grade_id: i64,
}

impl Default for DataStore {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            subjects: Vec::new(),
            students: Vec::new(),
            grades: Vec::new(),
            next_group_id: 1,
            next_subject_id: 1,
            next_student_id: 1,
            next_grade_id: 1,
        }
    }
}

fn next_id_after(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().map(|m| m.max(0) + 1).unwrap_or(1)
}

pub fn clean_name(raw: &str) -> Result<String, StoreError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(StoreError::Validation("name must not be empty".into()));
    }
    Ok(name.to_string())
}

pub fn check_grade_value(value: i64) -> Result<(), StoreError> {
    if !(MIN_GRADE..=MAX_GRADE).contains(&value) {
        return Err(StoreError::Validation(format!(
            "grade must be between {} and {}",
            MIN_GRADE, MAX_GRADE
        )));
    }
    Ok(())
}

impl DataStore {
    /// Builds a store from persisted rows. Grades whose student or subject is
    /// missing are dropped, dangling group references are cleared and every
    /// id counter restarts at `max(id) + 1`.
    pub fn from_rows(
        groups: Vec<Group>,
        subjects: Vec<Subject>,
        mut students: Vec<Student>,
        mut grades: Vec<Grade>,
    ) -> (Self, LoadRepairs) {
        let mut repairs = LoadRepairs::default();

        let group_ids: HashSet<i64> = groups.iter().map(|g| g.id).collect();
        for student in students.iter_mut() {
            if let Some(gid) = student.group_id {
                if !group_ids.contains(&gid) {
                    student.group_id = None;
                    repairs.students_ungrouped += 1;
                }
            }
        }

        let student_ids: HashSet<i64> = students.iter().map(|s| s.id).collect();
        let subject_ids: HashSet<i64> = subjects.iter().map(|s| s.id).collect();
        let before = grades.len();
        grades.retain(|g| student_ids.contains(&g.student_id) && subject_ids.contains(&g.subject_id));
        repairs.orphan_grades_dropped = before - grades.len();

        let store = Self {
            next_group_id: next_id_after(groups.iter().map(|g| g.id)),
            next_subject_id: next_id_after(subjects.iter().map(|s| s.id)),
            next_student_id: next_id_after(students.iter().map(|s| s.id)),
            next_grade_id: next_id_after(grades.iter().map(|g| g.id)),
            groups,
            subjects,
            students,
            grades,
        };
        (store, repairs)
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn grades(&self) -> &[Grade] {
        &self.grades
    }

    pub fn find_group(&self, id: i64) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn find_subject(&self, id: i64) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.id == id)
    }

    pub fn find_student(&self, id: i64) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    pub fn find_grade(&self, id: i64) -> Option<&Grade> {
        self.grades.iter().find(|g| g.id == id)
    }

    /// Equal collections, ignoring the id counters.
    pub fn content_eq(&self, other: &DataStore) -> bool {
        self.groups == other.groups
            && self.subjects == other.subjects
            && self.students == other.students
            && self.grades == other.grades
    }

    // ---- groups ----

    pub fn create_group(&mut self, name: &str) -> Result<i64, StoreError> {
        let name = clean_name(name)?;
        let id = self.next_group_id;
        self.next_group_id += 1;
        self.groups.push(Group { id, name });
        Ok(id)
    }

    pub fn rename_group(&mut self, id: i64, name: &str) -> Result<bool, StoreError> {
        let name = clean_name(name)?;
        let group = self
            .groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(StoreError::NotFound {
                kind: EntityKind::Group,
                id,
            })?;
        if group.name == name {
            return Ok(false);
        }
        group.name = name;
        Ok(true)
    }

    /// Students of the group stay; their group reference is cleared.
    pub fn delete_group(&mut self, id: i64) -> Result<CascadeReport, StoreError> {
        let pos = self
            .groups
            .iter()
            .position(|g| g.id == id)
            .ok_or(StoreError::NotFound {
                kind: EntityKind::Group,
                id,
            })?;
        self.groups.remove(pos);
        let mut report = CascadeReport::default();
        for student in self.students.iter_mut() {
            if student.group_id == Some(id) {
                student.group_id = None;
                report.students_updated += 1;
            }
        }
        Ok(report)
    }

    // ---- subjects ----

    pub fn create_subject(&mut self, name: &str) -> Result<i64, StoreError> {
        let name = clean_name(name)?;
        let id = self.next_subject_id;
        self.next_subject_id += 1;
        self.subjects.push(Subject { id, name });
        Ok(id)
    }

    pub fn rename_subject(&mut self, id: i64, name: &str) -> Result<bool, StoreError> {
        let name = clean_name(name)?;
        let subject = self
            .subjects
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(StoreError::NotFound {
                kind: EntityKind::Subject,
                id,
            })?;
        if subject.name == name {
            return Ok(false);
        }
        subject.name = name;
        Ok(true)
    }

    pub fn delete_subject(&mut self, id: i64) -> Result<CascadeReport, StoreError> {
        let pos = self
            .subjects
            .iter()
            .position(|s| s.id == id)
            .ok_or(StoreError::NotFound {
                kind: EntityKind::Subject,
                id,
            })?;
        self.subjects.remove(pos);
        let before = self.grades.len();
        self.grades.retain(|g| g.subject_id != id);
        Ok(CascadeReport {
            grades_removed: before - self.grades.len(),
            students_updated: 0,
        })
    }

    // ---- students ----

    fn check_group_ref(&self, group_id: Option<i64>) -> Result<(), StoreError> {
        match group_id {
            Some(gid) if self.find_group(gid).is_none() => Err(StoreError::Integrity {
                kind: EntityKind::Group,
                id: gid,
            }),
            _ => Ok(()),
        }
    }

    pub fn create_student(&mut self, name: &str, group_id: Option<i64>) -> Result<i64, StoreError> {
        let name = clean_name(name)?;
        self.check_group_ref(group_id)?;
        let id = self.next_student_id;
        self.next_student_id += 1;
        self.students.push(Student { id, name, group_id });
        Ok(id)
    }

    pub fn edit_student(&mut self, id: i64, edit: StudentEdit) -> Result<bool, StoreError> {
        if self.find_student(id).is_none() {
            return Err(StoreError::NotFound {
                kind: EntityKind::Student,
                id,
            });
        }
        let name = edit.name.as_deref().map(clean_name).transpose()?;
        if let Some(group_id) = edit.group {
            self.check_group_ref(group_id)?;
        }

        let mut changed = false;
        if let Some(student) = self.students.iter_mut().find(|s| s.id == id) {
            if let Some(name) = name {
                if student.name != name {
                    student.name = name;
                    changed = true;
                }
            }
            if let Some(group_id) = edit.group {
                if student.group_id != group_id {
                    student.group_id = group_id;
                    changed = true;
                }
            }
        }
        Ok(changed)
    }

    pub fn delete_student(&mut self, id: i64) -> Result<CascadeReport, StoreError> {
        let pos = self
            .students
            .iter()
            .position(|s| s.id == id)
            .ok_or(StoreError::NotFound {
                kind: EntityKind::Student,
                id,
            })?;
        self.students.remove(pos);
        let before = self.grades.len();
        self.grades.retain(|g| g.student_id != id);
        Ok(CascadeReport {
            grades_removed: before - self.grades.len(),
            students_updated: 0,
        })
    }

    // ---- grades ----

    pub fn create_grade(
        &mut self,
        student_id: i64,
        subject_id: i64,
        value: i64,
    ) -> Result<NewGrade, StoreError> {
        check_grade_value(value)?;
        if self.find_student(student_id).is_none() {
            return Err(StoreError::Integrity {
                kind: EntityKind::Student,
                id: student_id,
            });
        }
        if self.find_subject(subject_id).is_none() {
            return Err(StoreError::Integrity {
                kind: EntityKind::Subject,
                id: subject_id,
            });
        }
        let attempt = crate::calc::next_attempt(self, student_id, subject_id);
        let id = self.next_grade_id;
        self.next_grade_id += 1;
        self.grades.push(Grade {
            id,
            student_id,
            subject_id,
            value,
            attempt,
        });
        Ok(NewGrade { id, attempt })
    }

    /// Only the value is editable; the attempt number is fixed at creation.
    pub fn set_grade_value(&mut self, id: i64, value: i64) -> Result<bool, StoreError> {
        check_grade_value(value)?;
        let grade = self
            .grades
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(StoreError::NotFound {
                kind: EntityKind::Grade,
                id,
            })?;
        if grade.value == value {
            return Ok(false);
        }
        grade.value = value;
        Ok(true)
    }

    pub fn delete_grade(&mut self, id: i64) -> Result<Grade, StoreError> {
        let pos = self
            .grades
            .iter()
            .position(|g| g.id == id)
            .ok_or(StoreError::NotFound {
                kind: EntityKind::Grade,
                id,
            })?;
        Ok(self.grades.remove(pos))
    }

    pub fn group_label(&self, group_id: Option<i64>) -> String {
        match group_id {
            None => "No group".to_string(),
            Some(gid) => self
                .find_group(gid)
                .map(|g| g.name.clone())
                .unwrap_or_else(|| "Unknown group".to_string()),
        }
    }

    pub fn student_label(&self, id: i64) -> String {
        self.find_student(id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    pub fn subject_label(&self, id: i64) -> String {
        self.find_subject(id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataStore {
        let mut store = DataStore::default();
        let g1 = store.create_group("IS-21").unwrap();
        let g2 = store.create_group("IS-22").unwrap();
        let math = store.create_subject("Math").unwrap();
        let phys = store.create_subject("Physics").unwrap();
        let a = store.create_student("Anna", Some(g1)).unwrap();
        let b = store.create_student("Boris", Some(g1)).unwrap();
        let c = store.create_student("Clara", Some(g2)).unwrap();
        store.create_grade(a, math, 4).unwrap();
        store.create_grade(a, phys, 5).unwrap();
        store.create_grade(b, math, 2).unwrap();
        store.create_grade(b, math, 3).unwrap();
        store.create_grade(c, phys, 3).unwrap();
        store
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let mut store = DataStore::default();
        let a = store.create_subject("A").unwrap();
        store.delete_subject(a).unwrap();
        let b = store.create_subject("B").unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[test]
    fn delete_student_removes_only_their_grades() {
        let mut store = sample();
        let before: Vec<Grade> = store.grades().to_vec();
        let report = store.delete_student(2).unwrap();
        assert_eq!(report.grades_removed, 2);
        let expected: Vec<Grade> = before.into_iter().filter(|g| g.student_id != 2).collect();
        assert_eq!(store.grades(), expected.as_slice());
        assert!(store.find_student(2).is_none());
    }

    #[test]
    fn delete_subject_removes_only_its_grades() {
        let mut store = sample();
        let report = store.delete_subject(2).unwrap();
        assert_eq!(report.grades_removed, 2);
        assert!(store.grades().iter().all(|g| g.subject_id == 1));
        assert_eq!(store.grades().len(), 3);
    }

    #[test]
    fn delete_group_clears_membership_without_deleting_students() {
        let mut store = sample();
        let report = store.delete_group(1).unwrap();
        assert_eq!(report.students_updated, 2);
        assert_eq!(store.students().len(), 3);
        assert_eq!(store.find_student(1).unwrap().group_id, None);
        assert_eq!(store.find_student(2).unwrap().group_id, None);
        assert_eq!(store.find_student(3).unwrap().group_id, Some(2));
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let mut store = sample();
        assert_eq!(
            store.delete_group(99),
            Err(StoreError::NotFound {
                kind: EntityKind::Group,
                id: 99
            })
        );
        assert!(matches!(
            store.set_grade_value(99, 3),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.edit_student(99, StudentEdit::default()),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn foreign_keys_are_checked_before_mutation() {
        let mut store = sample();
        let grades_before = store.grades().len();
        assert_eq!(
            store.create_grade(42, 1, 5),
            Err(StoreError::Integrity {
                kind: EntityKind::Student,
                id: 42
            })
        );
        assert!(matches!(
            store.create_grade(1, 42, 5),
            Err(StoreError::Integrity { .. })
        ));
        assert!(matches!(
            store.create_student("Dan", Some(77)),
            Err(StoreError::Integrity { .. })
        ));
        assert_eq!(store.grades().len(), grades_before);
        assert_eq!(store.students().len(), 3);

        let edit = StudentEdit {
            name: Some("Renamed".into()),
            group: Some(Some(77)),
        };
        assert!(store.edit_student(1, edit).is_err());
        assert_eq!(store.find_student(1).unwrap().name, "Anna");
    }

    #[test]
    fn grade_values_are_range_checked() {
        let mut store = sample();
        assert!(matches!(
            store.create_grade(1, 1, 6),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            store.set_grade_value(1, 0),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn editing_grade_keeps_attempt() {
        let mut store = sample();
        assert!(store.set_grade_value(4, 5).unwrap());
        let g = store.find_grade(4).unwrap();
        assert_eq!((g.value, g.attempt), (5, 2));
        assert!(!store.set_grade_value(4, 5).unwrap());
    }

    #[test]
    fn edit_student_reports_changes() {
        let mut store = sample();
        let unchanged = StudentEdit {
            name: Some("  Anna ".into()),
            group: Some(Some(1)),
        };
        assert!(!store.edit_student(1, unchanged).unwrap());
        let ungroup = StudentEdit {
            name: None,
            group: Some(None),
        };
        assert!(store.edit_student(1, ungroup).unwrap());
        assert_eq!(store.find_student(1).unwrap().group_id, None);
    }

    #[test]
    fn blank_names_are_rejected() {
        let mut store = DataStore::default();
        assert!(matches!(
            store.create_group("   "),
            Err(StoreError::Validation(_))
        ));
        assert!(store.groups().is_empty());
    }

    #[test]
    fn from_rows_repairs_references_and_counters() {
        let groups = vec![Group {
            id: 3,
            name: "G".into(),
        }];
        let subjects = vec![Subject {
            id: 5,
            name: "S".into(),
        }];
        let students = vec![
            Student {
                id: 1,
                name: "A".into(),
                group_id: Some(3),
            },
            Student {
                id: 4,
                name: "B".into(),
                group_id: Some(9),
            },
        ];
        let grades = vec![
            Grade {
                id: 10,
                student_id: 1,
                subject_id: 5,
                value: 4,
                attempt: 1,
            },
            Grade {
                id: 11,
                student_id: 2,
                subject_id: 5,
                value: 4,
                attempt: 1,
            },
            Grade {
                id: 12,
                student_id: 1,
                subject_id: 6,
                value: 4,
                attempt: 1,
            },
        ];
        let (mut store, repairs) = DataStore::from_rows(groups, subjects, students, grades);
        assert_eq!(repairs.orphan_grades_dropped, 2);
        assert_eq!(repairs.students_ungrouped, 1);
        assert_eq!(store.find_student(4).unwrap().group_id, None);
        assert_eq!(store.grades().len(), 1);

        assert_eq!(store.create_group("H").unwrap(), 4);
        assert_eq!(store.create_subject("T").unwrap(), 6);
        assert_eq!(store.create_student("C", None).unwrap(), 5);
        assert_eq!(store.create_grade(1, 5, 3).unwrap().id, 11);
    }

    #[test]
    fn empty_rows_start_counters_at_one() {
        let (mut store, repairs) = DataStore::from_rows(vec![], vec![], vec![], vec![]);
        assert_eq!(repairs, LoadRepairs::default());
        assert_eq!(store.create_group("G").unwrap(), 1);
    }
}
