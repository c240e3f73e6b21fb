use crate::model::DataStore;
use anyhow::Context;
use serde::Serialize;
use std::path::Path;

pub const DELIMITER: char = ';';
const BOM: &str = "\u{feff}";

pub const GROUPS_FILE: &str = "export_groups.csv";
pub const STUDENTS_FILE: &str = "export_students.csv";
pub const SUBJECTS_FILE: &str = "export_subjects.csv";
pub const GRADES_FILE: &str = "export_grades.csv";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedFile {
    pub path: String,
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub dir: String,
    pub files: Vec<ExportedFile>,
    pub exported_at: String,
}

pub fn csv_escape(s: &str) -> String {
    if s.contains(DELIMITER) || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn write_table(
    dir: &Path,
    file_name: &str,
    header: &[&str],
    rows: Vec<Vec<String>>,
) -> anyhow::Result<ExportedFile> {
    let sep = DELIMITER.to_string();
    let mut out = String::from(BOM);
    out.push_str(&header.join(sep.as_str()));
    out.push('\n');
    for row in &rows {
        let cells: Vec<String> = row.iter().map(|c| csv_escape(c)).collect();
        out.push_str(&cells.join(sep.as_str()));
        out.push('\n');
    }
    let path = dir.join(file_name);
    std::fs::write(&path, out)
        .with_context(|| format!("failed to write {}", path.to_string_lossy()))?;
    Ok(ExportedFile {
        path: path.to_string_lossy().to_string(),
        rows: rows.len(),
    })
}

/// Writes one file per collection into `dir`, creating it when missing.
/// Students carry both the group id (0 when ungrouped) and its label.
pub fn export_csv(store: &DataStore, dir: &Path) -> anyhow::Result<ExportSummary> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.to_string_lossy()))?;

    let groups: Vec<Vec<String>> = store
        .groups()
        .iter()
        .map(|g| vec![g.id.to_string(), g.name.clone()])
        .collect();
    let students: Vec<Vec<String>> = store
        .students()
        .iter()
        .map(|s| {
            vec![
                s.id.to_string(),
                s.name.clone(),
                s.group_id.unwrap_or(0).to_string(),
                store.group_label(s.group_id),
            ]
        })
        .collect();
    let subjects: Vec<Vec<String>> = store
        .subjects()
        .iter()
        .map(|s| vec![s.id.to_string(), s.name.clone()])
        .collect();
    let grades: Vec<Vec<String>> = store
        .grades()
        .iter()
        .map(|g| {
            vec![
                g.id.to_string(),
                g.student_id.to_string(),
                g.subject_id.to_string(),
                g.attempt.to_string(),
                g.value.to_string(),
            ]
        })
        .collect();

    let files = vec![
        write_table(dir, GROUPS_FILE, &["ID", "Name"], groups)?,
        write_table(
            dir,
            STUDENTS_FILE,
            &["ID", "Name", "GroupID", "Group"],
            students,
        )?,
        write_table(dir, SUBJECTS_FILE, &["ID", "Name"], subjects)?,
        write_table(
            dir,
            GRADES_FILE,
            &["ID", "StudentID", "SubjectID", "Attempt", "Grade"],
            grades,
        )?,
    ];
    tracing::info!(dir = %dir.display(), "exported {} files", files.len());

    Ok(ExportSummary {
        dir: dir.to_string_lossy().to_string(),
        files,
        exported_at: chrono::Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_quotes_only_when_needed() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "a,b");
        assert_eq!(csv_escape("a;b"), "\"a;b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn writes_four_files_with_bom() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("out");
        let mut store = DataStore::default();
        let g = store.create_group("A;B").unwrap();
        let math = store.create_subject("Математика").unwrap();
        let ann = store.create_student("Ann", Some(g)).unwrap();
        store.create_student("Lee", None).unwrap();
        store.create_grade(ann, math, 4).unwrap();
        store.create_grade(ann, math, 5).unwrap();

        let summary = export_csv(&store, &out).expect("export");
        assert_eq!(summary.files.len(), 4);
        assert_eq!(
            summary.files.iter().map(|f| f.rows).collect::<Vec<_>>(),
            vec![1, 2, 1, 2]
        );

        let students = std::fs::read_to_string(out.join(STUDENTS_FILE)).unwrap();
        assert!(students.starts_with('\u{feff}'));
        let lines: Vec<&str> = students.trim_start_matches('\u{feff}').lines().collect();
        assert_eq!(
            lines,
            vec!["ID;Name;GroupID;Group", "1;Ann;1;\"A;B\"", "2;Lee;0;No group"]
        );

        let grades = std::fs::read_to_string(out.join(GRADES_FILE)).unwrap();
        assert!(grades.ends_with("2;1;1;2;5\n"));
    }

    #[test]
    fn empty_store_writes_headers_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        export_csv(&DataStore::default(), dir.path()).expect("export");
        let groups = std::fs::read_to_string(dir.path().join(GROUPS_FILE)).unwrap();
        assert_eq!(groups, "\u{feff}ID;Name\n");
    }
}
