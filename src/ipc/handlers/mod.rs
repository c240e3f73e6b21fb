pub mod core;
pub mod export;
pub mod grades;
pub mod groups;
pub mod journal;
pub mod reports;
pub mod students;
pub mod subjects;
