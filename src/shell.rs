use crate::ipc::{self, AppState, Request};
use crate::model::{DataStore, MAX_GRADE, MIN_GRADE};
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("input closed")]
    InputClosed,
    #[error(transparent)]
    Io(#[from] io::Error),
}

type ShellResult<T> = Result<T, ShellError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Students,
    Groups,
    Subjects,
    Grades,
    Reports,
    Journal,
    Export,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    ListStudents,
    ListStudentsDetailed,
    AddStudent,
    EditStudent,
    DeleteStudent,
    SearchStudents,
    ListGroups,
    AddGroup,
    RenameGroup,
    DeleteGroup,
    ListSubjects,
    AddSubject,
    RenameSubject,
    DeleteSubject,
    ListGrades,
    AddGrade,
    EditGrade,
    DeleteGrade,
    StudentAverages,
    SubjectAverages,
    SubjectDetail,
    TopN,
    Retakes,
    JournalMatrix,
    JournalBySubject,
    JournalByStudent,
    ExportCsv,
}

const MAIN_MENU: &[(&str, Section)] = &[
    ("Students", Section::Students),
    ("Groups", Section::Groups),
    ("Subjects", Section::Subjects),
    ("Grades", Section::Grades),
    ("Reports", Section::Reports),
    ("Journal", Section::Journal),
    ("Export", Section::Export),
];

const STUDENTS_MENU: &[(&str, Action)] = &[
    ("List students", Action::ListStudents),
    ("List students with subject details", Action::ListStudentsDetailed),
    ("Add student", Action::AddStudent),
    ("Edit student", Action::EditStudent),
    ("Delete student", Action::DeleteStudent),
    ("Search students", Action::SearchStudents),
];

const GROUPS_MENU: &[(&str, Action)] = &[
    ("List groups", Action::ListGroups),
    ("Add group", Action::AddGroup),
    ("Rename group", Action::RenameGroup),
    ("Delete group", Action::DeleteGroup),
];

const SUBJECTS_MENU: &[(&str, Action)] = &[
    ("List subjects", Action::ListSubjects),
    ("Add subject", Action::AddSubject),
    ("Rename subject", Action::RenameSubject),
    ("Delete subject", Action::DeleteSubject),
];

const GRADES_MENU: &[(&str, Action)] = &[
    ("List grades", Action::ListGrades),
    ("Add grade", Action::AddGrade),
    ("Edit grade", Action::EditGrade),
    ("Delete grade", Action::DeleteGrade),
];

const REPORTS_MENU: &[(&str, Action)] = &[
    ("Student averages", Action::StudentAverages),
    ("Subject averages", Action::SubjectAverages),
    ("Subject detail", Action::SubjectDetail),
    ("Top students", Action::TopN),
    ("Retakes", Action::Retakes),
];

const JOURNAL_MENU: &[(&str, Action)] = &[
    ("Latest grades matrix", Action::JournalMatrix),
    ("By subject", Action::JournalBySubject),
    ("By student", Action::JournalByStudent),
];

const EXPORT_MENU: &[(&str, Action)] = &[("Export all to CSV", Action::ExportCsv)];

fn section_menu(section: Section) -> &'static [(&'static str, Action)] {
    match section {
        Section::Students => STUDENTS_MENU,
        Section::Groups => GROUPS_MENU,
        Section::Subjects => SUBJECTS_MENU,
        Section::Grades => GRADES_MENU,
        Section::Reports => REPORTS_MENU,
        Section::Journal => JOURNAL_MENU,
        Section::Export => EXPORT_MENU,
    }
}

fn group_exists(store: &DataStore, id: i64) -> bool {
    store.find_group(id).is_some()
}

fn subject_exists(store: &DataStore, id: i64) -> bool {
    store.find_subject(id).is_some()
}

fn student_exists(store: &DataStore, id: i64) -> bool {
    store.find_student(id).is_some()
}

fn grade_exists(store: &DataStore, id: i64) -> bool {
    store.find_grade(id).is_some()
}

/// Numbered-menu console. Every operation goes through the same command
/// table as the stdio protocol; the shell only collects and checks input.
pub struct Shell<'a, R, W> {
    state: &'a mut AppState,
    input: R,
    out: W,
    next_id: u64,
}

impl<'a, R: BufRead, W: Write> Shell<'a, R, W> {
    pub fn new(state: &'a mut AppState, input: R, out: W) -> Self {
        Self {
            state,
            input,
            out,
            next_id: 0,
        }
    }

    /// Runs until Exit or end of input. Both paths end with a full save.
    pub fn run(&mut self) -> io::Result<()> {
        match self.main_loop() {
            Ok(()) => self.final_save(),
            Err(ShellError::InputClosed) => {
                tracing::info!("input closed, saving before exit");
                let _ = writeln!(self.out);
                self.final_save()
            }
            Err(ShellError::Io(e)) => {
                let _ = self.final_save();
                Err(e)
            }
        }
    }

    fn final_save(&mut self) -> io::Result<()> {
        let resp = self.call("store.save", json!({}));
        if resp["ok"] == true {
            writeln!(self.out, "Data saved.")?;
        } else {
            let message = resp["error"]["message"].as_str().unwrap_or("unknown error");
            writeln!(self.out, "Warning: data was not saved: {}", message)?;
        }
        self.out.flush()
    }

    fn main_loop(&mut self) -> ShellResult<()> {
        loop {
            let Some(section) = self.choose("Main menu", MAIN_MENU, "Exit")? else {
                return Ok(());
            };
            let items = section_menu(section);
            while let Some(action) = self.choose(section_title(section), items, "Back")? {
                self.run_action(action)?;
            }
        }
    }

    fn run_action(&mut self, action: Action) -> ShellResult<()> {
        match action {
            Action::ListStudents => self.query("students.list", json!({})).map(drop),
            Action::ListStudentsDetailed => {
                self.query("students.listDetailed", json!({})).map(drop)
            }
            Action::AddStudent => self.add_student().map(drop),
            Action::EditStudent => self.edit_student(),
            Action::DeleteStudent => self.delete_student(),
            Action::SearchStudents => self.search_students(),
            Action::ListGroups => self.query("groups.list", json!({})).map(drop),
            Action::AddGroup => self.add_group().map(drop),
            Action::RenameGroup => self.rename("group", "groups", "groupId", group_exists),
            Action::DeleteGroup => self.delete_group(),
            Action::ListSubjects => self.query("subjects.list", json!({})).map(drop),
            Action::AddSubject => self.add_subject().map(drop),
            Action::RenameSubject => {
                self.rename("subject", "subjects", "subjectId", subject_exists)
            }
            Action::DeleteSubject => self.delete_subject(),
            Action::ListGrades => self.query("grades.list", json!({})).map(drop),
            Action::AddGrade => self.add_grade(),
            Action::EditGrade => self.edit_grade(),
            Action::DeleteGrade => self.delete_grade(),
            Action::StudentAverages => self.query("reports.studentAverages", json!({})).map(drop),
            Action::SubjectAverages => self.query("reports.subjectAverages", json!({})).map(drop),
            Action::SubjectDetail => self.subject_detail(),
            Action::TopN => self.top_n(),
            Action::Retakes => self.query("reports.retakes", json!({})).map(drop),
            Action::JournalMatrix => {
                let group = self.prompt_group_filter()?;
                self.query("journal.matrix", json!({ "group": group }))
                    .map(drop)
            }
            Action::JournalBySubject => self.journal_by_subject(),
            Action::JournalByStudent => self.journal_by_student(),
            Action::ExportCsv => self.export_csv(),
        }
    }

    // ---- plumbing ----

    fn call(&mut self, method: &str, params: Value) -> Value {
        self.next_id += 1;
        ipc::handle_request(
            self.state,
            Request::new(self.next_id.to_string(), method, params),
        )
    }

    /// Prints the rendered lines of a response, or its error. Returns the
    /// result object on success.
    fn show(&mut self, mut resp: Value) -> ShellResult<Option<Value>> {
        if resp["ok"] != true {
            let message = resp["error"]["message"].as_str().unwrap_or("unknown error");
            writeln!(self.out, "Error: {}", message)?;
            return Ok(None);
        }
        let result = resp["result"].take();
        if let Some(lines) = result["lines"].as_array() {
            for line in lines.iter().filter_map(|l| l.as_str()) {
                writeln!(self.out, "{}", line)?;
            }
        }
        if let Some(warning) = result["warning"].as_str() {
            writeln!(self.out, "Warning: {}", warning)?;
        }
        Ok(Some(result))
    }

    fn query(&mut self, method: &str, params: Value) -> ShellResult<Option<Value>> {
        let resp = self.call(method, params);
        self.show(resp)
    }

    fn report_change(&mut self, result: Option<Value>) -> ShellResult<()> {
        match result {
            Some(r) if r["changed"] == false => writeln!(self.out, "Nothing changed.")?,
            Some(_) => writeln!(self.out, "Updated.")?,
            None => {}
        }
        Ok(())
    }

    fn choose<T: Copy>(
        &mut self,
        title: &str,
        items: &[(&str, T)],
        zero_label: &str,
    ) -> ShellResult<Option<T>> {
        writeln!(self.out)?;
        writeln!(self.out, "{}:", title)?;
        for (i, (label, _)) in items.iter().enumerate() {
            writeln!(self.out, "{}) {}", i + 1, label)?;
        }
        writeln!(self.out, "0) {}", zero_label)?;
        let choice = self.prompt_int("Choice", 0, items.len() as i64)?;
        if choice == 0 {
            return Ok(None);
        }
        Ok(items.get((choice - 1) as usize).map(|(_, item)| *item))
    }

    // ---- prompts ----

    fn read_line(&mut self) -> ShellResult<String> {
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(ShellError::InputClosed);
        }
        Ok(line.trim().to_string())
    }

    fn prompt_raw(&mut self, label: &str) -> ShellResult<String> {
        write!(self.out, "{}: ", label)?;
        self.read_line()
    }

    fn prompt_text(&mut self, label: &str) -> ShellResult<String> {
        loop {
            let text = self.prompt_raw(label)?;
            if !text.is_empty() {
                return Ok(text);
            }
            writeln!(self.out, "Value must not be empty.")?;
        }
    }

    fn prompt_int(&mut self, label: &str, min: i64, max: i64) -> ShellResult<i64> {
        loop {
            let raw = self.prompt_raw(label)?;
            match raw.parse::<i64>() {
                Ok(v) if (min..=max).contains(&v) => return Ok(v),
                _ => writeln!(self.out, "Enter a number from {} to {}.", min, max)?,
            }
        }
    }

    fn prompt_yes_no(&mut self, label: &str) -> ShellResult<bool> {
        loop {
            let raw = self.prompt_raw(&format!("{} (y/n)", label))?;
            match raw.to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.out, "Answer y or n.")?,
            }
        }
    }

    /// Asks for the id of an existing record; `0` cancels.
    fn prompt_id(
        &mut self,
        label: &str,
        exists: fn(&DataStore, i64) -> bool,
    ) -> ShellResult<Option<i64>> {
        loop {
            let raw = self.prompt_raw(&format!("{} (0 to cancel)", label))?;
            match raw.parse::<i64>() {
                Ok(0) => return Ok(None),
                Ok(id) if id > 0 && exists(&self.state.store, id) => return Ok(Some(id)),
                Ok(id) if id > 0 => writeln!(self.out, "No record with id {}.", id)?,
                _ => writeln!(self.out, "Enter a positive id, or 0 to cancel.")?,
            }
        }
    }

    fn prompt_group_filter(&mut self) -> ShellResult<Value> {
        loop {
            let raw = self.prompt_raw("Group filter (a = all, u = no group, or group id)")?;
            match raw.to_lowercase().as_str() {
                "" | "a" => return Ok(json!("all")),
                "u" => return Ok(json!("ungrouped")),
                other => match other.parse::<i64>() {
                    Ok(id) if group_exists(&self.state.store, id) => return Ok(json!(id)),
                    _ => writeln!(self.out, "Enter a, u or an existing group id.")?,
                },
            }
        }
    }

    fn prompt_min_average(&mut self) -> ShellResult<Option<f64>> {
        loop {
            let raw = self.prompt_raw("Minimum average (empty = any)")?;
            if raw.is_empty() {
                return Ok(None);
            }
            match raw.replace(',', ".").parse::<f64>() {
                Ok(v) if (0.0..=MAX_GRADE as f64).contains(&v) => return Ok(Some(v)),
                _ => writeln!(self.out, "Enter a number from 0 to {}.", MAX_GRADE)?,
            }
        }
    }

    // ---- groups & subjects ----

    fn add_group(&mut self) -> ShellResult<Option<i64>> {
        let name = self.prompt_text("Group name")?;
        let result = self.query("groups.create", json!({ "name": name }))?;
        let id = result.and_then(|r| r["groupId"].as_i64());
        if let Some(id) = id {
            writeln!(self.out, "Group added with id {}.", id)?;
        }
        Ok(id)
    }

    fn add_subject(&mut self) -> ShellResult<Option<i64>> {
        let name = self.prompt_text("Subject name")?;
        let result = self.query("subjects.create", json!({ "name": name }))?;
        let id = result.and_then(|r| r["subjectId"].as_i64());
        if let Some(id) = id {
            writeln!(self.out, "Subject added with id {}.", id)?;
        }
        Ok(id)
    }

    fn rename(
        &mut self,
        noun: &str,
        prefix: &str,
        id_key: &str,
        exists: fn(&DataStore, i64) -> bool,
    ) -> ShellResult<()> {
        self.query(&format!("{}.list", prefix), json!({}))?;
        let Some(id) = self.prompt_id(&format!("{} id", capitalize(noun)), exists)? else {
            return Ok(());
        };
        let name = self.prompt_text("New name")?;
        let mut params = json!({ "name": name });
        params[id_key] = json!(id);
        let result = self.query(&format!("{}.update", prefix), params)?;
        self.report_change(result)
    }

    fn delete_group(&mut self) -> ShellResult<()> {
        self.query("groups.list", json!({}))?;
        let Some(id) = self.prompt_id("Group id", group_exists)? else {
            return Ok(());
        };
        if !self.prompt_yes_no("Delete this group? Its students stay without a group")? {
            return Ok(());
        }
        if let Some(r) = self.query("groups.delete", json!({ "groupId": id }))? {
            writeln!(
                self.out,
                "Group deleted; {} student(s) now have no group.",
                r["studentsUpdated"]
            )?;
        }
        Ok(())
    }

    fn delete_subject(&mut self) -> ShellResult<()> {
        self.query("subjects.list", json!({}))?;
        let Some(id) = self.prompt_id("Subject id", subject_exists)? else {
            return Ok(());
        };
        if !self.prompt_yes_no("Delete this subject and all of its grades?")? {
            return Ok(());
        }
        if let Some(r) = self.query("subjects.delete", json!({ "subjectId": id }))? {
            writeln!(
                self.out,
                "Subject deleted; {} grade(s) removed.",
                r["gradesRemoved"]
            )?;
        }
        Ok(())
    }

    // ---- students ----

    /// No group, an existing group, or a group created on the spot.
    fn pick_group(&mut self) -> ShellResult<Option<i64>> {
        loop {
            writeln!(self.out, "Group:")?;
            writeln!(self.out, "1) No group")?;
            writeln!(self.out, "2) Existing group")?;
            writeln!(self.out, "3) New group")?;
            match self.prompt_int("Choice", 1, 3)? {
                1 => return Ok(None),
                2 => {
                    if self.state.store.groups().is_empty() {
                        writeln!(self.out, "No groups yet.")?;
                        continue;
                    }
                    self.query("groups.list", json!({}))?;
                    if let Some(id) = self.prompt_id("Group id", group_exists)? {
                        return Ok(Some(id));
                    }
                }
                _ => {
                    if let Some(id) = self.add_group()? {
                        return Ok(Some(id));
                    }
                }
            }
        }
    }

    fn add_student(&mut self) -> ShellResult<Option<i64>> {
        let name = self.prompt_text("Student name")?;
        let group_id = self.pick_group()?;
        let result = self.query(
            "students.create",
            json!({ "name": name, "groupId": group_id }),
        )?;
        let id = result.and_then(|r| r["studentId"].as_i64());
        if let Some(id) = id {
            writeln!(self.out, "Student added with id {}.", id)?;
        }
        Ok(id)
    }

    fn edit_student(&mut self) -> ShellResult<()> {
        if self.state.store.students().is_empty() {
            writeln!(self.out, "No students.")?;
            return Ok(());
        }
        self.query("students.list", json!({}))?;
        let Some(id) = self.prompt_id("Student id", student_exists)? else {
            return Ok(());
        };
        let name = self.prompt_raw("New name (empty keeps the current one)")?;
        let mut params = json!({ "studentId": id });
        if !name.is_empty() {
            params["name"] = json!(name);
        }
        if self.prompt_yes_no("Change group?")? {
            params["groupId"] = json!(self.pick_group()?);
        }
        let result = self.query("students.update", params)?;
        self.report_change(result)
    }

    fn delete_student(&mut self) -> ShellResult<()> {
        self.query("students.list", json!({}))?;
        let Some(id) = self.prompt_id("Student id", student_exists)? else {
            return Ok(());
        };
        if !self.prompt_yes_no("Delete this student and all of their grades?")? {
            return Ok(());
        }
        if let Some(r) = self.query("students.delete", json!({ "studentId": id }))? {
            writeln!(
                self.out,
                "Student deleted; {} grade(s) removed.",
                r["gradesRemoved"]
            )?;
        }
        Ok(())
    }

    fn search_students(&mut self) -> ShellResult<()> {
        let group = self.prompt_group_filter()?;
        let name = self.prompt_raw("Name contains (empty = any)")?;
        let min_average = self.prompt_min_average()?;
        writeln!(self.out, "Sort by: 1) id 2) name 3) average")?;
        let sort_key = match self.prompt_int("Choice", 1, 3)? {
            1 => "id",
            2 => "name",
            _ => "average",
        };
        writeln!(self.out, "Order: 1) ascending 2) descending")?;
        let sort_order = if self.prompt_int("Choice", 1, 2)? == 1 {
            "asc"
        } else {
            "desc"
        };
        self.query(
            "students.search",
            json!({
                "group": group,
                "name": name,
                "minAverage": min_average,
                "sortKey": sort_key,
                "sortOrder": sort_order,
            }),
        )
        .map(drop)
    }

    // ---- grades ----

    fn add_grade(&mut self) -> ShellResult<()> {
        if self.state.store.students().is_empty() {
            writeln!(self.out, "No students yet.")?;
            if !self.prompt_yes_no("Create one now?")? || self.add_student()?.is_none() {
                return Ok(());
            }
        }
        if self.state.store.subjects().is_empty() {
            writeln!(self.out, "No subjects yet.")?;
            if !self.prompt_yes_no("Create one now?")? || self.add_subject()?.is_none() {
                return Ok(());
            }
        }

        self.query("students.list", json!({}))?;
        let Some(student_id) = self.prompt_id("Student id", student_exists)? else {
            return Ok(());
        };
        self.query("subjects.list", json!({}))?;
        let Some(subject_id) = self.prompt_id("Subject id", subject_exists)? else {
            return Ok(());
        };
        let value = self.prompt_int("Grade", MIN_GRADE, MAX_GRADE)?;
        let result = self.query(
            "grades.create",
            json!({ "studentId": student_id, "subjectId": subject_id, "value": value }),
        )?;
        if let Some(r) = result {
            writeln!(self.out, "Grade added (attempt {}).", r["attempt"])?;
        }
        Ok(())
    }

    fn edit_grade(&mut self) -> ShellResult<()> {
        self.query("grades.list", json!({}))?;
        let Some(id) = self.prompt_id("Grade id", grade_exists)? else {
            return Ok(());
        };
        let value = self.prompt_int("New grade", MIN_GRADE, MAX_GRADE)?;
        let result = self.query("grades.update", json!({ "gradeId": id, "value": value }))?;
        self.report_change(result)
    }

    fn delete_grade(&mut self) -> ShellResult<()> {
        self.query("grades.list", json!({}))?;
        let Some(id) = self.prompt_id("Grade id", grade_exists)? else {
            return Ok(());
        };
        if !self.prompt_yes_no("Delete this grade?")? {
            return Ok(());
        }
        if self.query("grades.delete", json!({ "gradeId": id }))?.is_some() {
            writeln!(self.out, "Grade deleted.")?;
        }
        Ok(())
    }

    // ---- reports & journal ----

    fn subject_detail(&mut self) -> ShellResult<()> {
        self.query("subjects.list", json!({}))?;
        let Some(id) = self.prompt_id("Subject id", subject_exists)? else {
            return Ok(());
        };
        self.query("reports.subjectDetail", json!({ "subjectId": id }))
            .map(drop)
    }

    fn top_n(&mut self) -> ShellResult<()> {
        let ranked = self.call("reports.rankedCount", json!({}))["result"]["rankedCount"]
            .as_i64()
            .unwrap_or(0);
        let n = if ranked == 0 {
            1
        } else {
            self.prompt_int(&format!("How many students (1-{})", ranked), 1, ranked)?
        };
        self.query("reports.topN", json!({ "n": n })).map(drop)
    }

    fn journal_by_subject(&mut self) -> ShellResult<()> {
        self.query("subjects.list", json!({}))?;
        let Some(id) = self.prompt_id("Subject id", subject_exists)? else {
            return Ok(());
        };
        let group = self.prompt_group_filter()?;
        self.query(
            "journal.bySubject",
            json!({ "subjectId": id, "group": group }),
        )
        .map(drop)
    }

    fn journal_by_student(&mut self) -> ShellResult<()> {
        self.query("students.list", json!({}))?;
        let Some(id) = self.prompt_id("Student id", student_exists)? else {
            return Ok(());
        };
        self.query("journal.byStudent", json!({ "studentId": id }))
            .map(drop)
    }

    fn export_csv(&mut self) -> ShellResult<()> {
        let Some(result) = self.query("export.csv", json!({}))? else {
            return Ok(());
        };
        for file in result["files"].as_array().into_iter().flatten() {
            writeln!(
                self.out,
                "Wrote {} ({} rows)",
                file["path"].as_str().unwrap_or(""),
                file["rows"]
            )?;
        }
        Ok(())
    }
}

fn section_title(section: Section) -> &'static str {
    MAIN_MENU
        .iter()
        .find(|(_, s)| *s == section)
        .map(|(label, _)| *label)
        .unwrap_or("Menu")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
