use crate::model::{DataStore, Grade, Group, LoadRepairs, Student, Subject};
use anyhow::Context;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, Row};
use std::path::Path;

pub const DB_FILE_NAME: &str = "data_store.db";

pub fn open_db(db_path: &Path) -> anyhow::Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS groups(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            group_id INTEGER,
            FOREIGN KEY(group_id) REFERENCES groups(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS grades(
            id INTEGER PRIMARY KEY,
            student_id INTEGER NOT NULL,
            subject_id INTEGER NOT NULL,
            value INTEGER NOT NULL,
            attempt INTEGER NOT NULL,
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(subject_id) REFERENCES subjects(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grades_student_subject ON grades(student_id, subject_id)",
        [],
    )?;

    Ok(conn)
}

#[derive(Debug)]
pub struct Loaded {
    pub store: DataStore,
    /// Whether the database file was already there before opening it.
    pub existed: bool,
    pub repairs: LoadRepairs,
    /// Rows left out because a required cell could not be read as its type.
    pub skipped_rows: usize,
}

/// Reads a cell as text the way SQLite itself would: numbers print,
/// blobs are taken as (lossy) UTF-8.
fn text_cell(r: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match r.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Integer(v) => Some(v.to_string()),
        ValueRef::Real(v) => Some(v.to_string()),
        ValueRef::Text(b) | ValueRef::Blob(b) => Some(String::from_utf8_lossy(b).into_owned()),
    })
}

/// Reads a cell as an integer. Reals truncate and numeric text parses;
/// anything else is `None`.
fn int_cell(r: &Row<'_>, idx: usize) -> rusqlite::Result<Option<i64>> {
    Ok(match r.get_ref(idx)? {
        ValueRef::Integer(v) => Some(v),
        ValueRef::Real(v) if v.is_finite() => Some(v.trunc() as i64),
        ValueRef::Text(b) => std::str::from_utf8(b)
            .ok()
            .and_then(|s| s.trim().parse().ok()),
        _ => None,
    })
}

fn read_rows<T>(
    conn: &Connection,
    table: &str,
    sql: &str,
    skipped: &mut usize,
    map: impl Fn(&Row<'_>) -> rusqlite::Result<Option<T>>,
) -> anyhow::Result<Vec<T>> {
    let mut stmt = conn
        .prepare(sql)
        .with_context(|| format!("failed to read {}", table))?;
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        match map(r)? {
            Some(v) => out.push(v),
            None => {
                *skipped += 1;
                tracing::warn!(table, row = ?r.get_ref(0).ok(), "skipping unreadable row");
            }
        }
    }
    Ok(out)
}

/// Reads every collection ordered by id and repairs dangling references.
/// Cells are coerced to the column's type; a row is skipped only when a
/// required cell has no sensible reading.
pub fn load_store(db_path: &Path) -> anyhow::Result<Loaded> {
    let existed = db_path.is_file();
    let conn = open_db(db_path)?;
    let mut skipped_rows = 0;

    let groups = read_rows(
        &conn,
        "groups",
        "SELECT id, name FROM groups ORDER BY id",
        &mut skipped_rows,
        |r| {
            Ok(match (int_cell(r, 0)?, text_cell(r, 1)?) {
                (Some(id), Some(name)) => Some(Group { id, name }),
                _ => None,
            })
        },
    )?;

    let students = read_rows(
        &conn,
        "students",
        "SELECT id, name, group_id FROM students ORDER BY id",
        &mut skipped_rows,
        |r| {
            Ok(match (int_cell(r, 0)?, text_cell(r, 1)?) {
                (Some(id), Some(name)) => Some(Student {
                    id,
                    name,
                    group_id: int_cell(r, 2)?.filter(|gid| *gid != 0),
                }),
                _ => None,
            })
        },
    )?;

    let subjects = read_rows(
        &conn,
        "subjects",
        "SELECT id, name FROM subjects ORDER BY id",
        &mut skipped_rows,
        |r| {
            Ok(match (int_cell(r, 0)?, text_cell(r, 1)?) {
                (Some(id), Some(name)) => Some(Subject { id, name }),
                _ => None,
            })
        },
    )?;

    let grades = read_rows(
        &conn,
        "grades",
        "SELECT id, student_id, subject_id, value, attempt FROM grades ORDER BY id",
        &mut skipped_rows,
        |r| {
            Ok(
                match (
                    int_cell(r, 0)?,
                    int_cell(r, 1)?,
                    int_cell(r, 2)?,
                    int_cell(r, 3)?,
                    int_cell(r, 4)?,
                ) {
                    (Some(id), Some(student_id), Some(subject_id), Some(value), Some(attempt)) => {
                        Some(Grade {
                            id,
                            student_id,
                            subject_id,
                            value,
                            attempt,
                        })
                    }
                    _ => None,
                },
            )
        },
    )?;

    let (store, repairs) = DataStore::from_rows(groups, subjects, students, grades);
    Ok(Loaded {
        store,
        existed,
        repairs,
        skipped_rows,
    })
}

/// Full replace of the four tables inside one transaction. Any failure rolls
/// back and leaves the previous contents on disk untouched.
pub fn save_store(store: &DataStore, db_path: &Path) -> anyhow::Result<()> {
    let mut conn = open_db(db_path)?;
    let tx = conn.transaction()?;

    // Dependents first so foreign keys never dangle mid-transaction.
    tx.execute("DELETE FROM grades", [])?;
    tx.execute("DELETE FROM students", [])?;
    tx.execute("DELETE FROM subjects", [])?;
    tx.execute("DELETE FROM groups", [])?;

    {
        let mut stmt = tx.prepare("INSERT INTO groups(id, name) VALUES(?, ?)")?;
        for g in store.groups() {
            stmt.execute((g.id, &g.name))
                .with_context(|| format!("insert group {}", g.id))?;
        }

        let mut stmt = tx.prepare("INSERT INTO students(id, name, group_id) VALUES(?, ?, ?)")?;
        for s in store.students() {
            stmt.execute((s.id, &s.name, s.group_id))
                .with_context(|| format!("insert student {}", s.id))?;
        }

        let mut stmt = tx.prepare("INSERT INTO subjects(id, name) VALUES(?, ?)")?;
        for s in store.subjects() {
            stmt.execute((s.id, &s.name))
                .with_context(|| format!("insert subject {}", s.id))?;
        }

        let mut stmt = tx.prepare(
            "INSERT INTO grades(id, student_id, subject_id, value, attempt)
             VALUES(?, ?, ?, ?, ?)",
        )?;
        for g in store.grades() {
            stmt.execute((g.id, g.student_id, g.subject_id, g.value, g.attempt))
                .with_context(|| format!("insert grade {}", g.id))?;
        }
    }

    tx.commit()?;
    Ok(())
}
