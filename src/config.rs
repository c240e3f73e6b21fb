use crate::db::DB_FILE_NAME;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub export_dir: PathBuf,
}

impl Config {
    pub fn new(data_dir: impl Into<PathBuf>, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            export_dir: export_dir.into(),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    /// Creates both directories. A failure is logged and otherwise ignored;
    /// the save or export that needs the directory reports it later.
    pub fn ensure_dirs(&self) {
        for dir in [&self.data_dir, &self.export_dir] {
            ensure_dir(dir);
        }
    }
}

fn ensure_dir(dir: &Path) {
    if let Err(e) = std::fs::create_dir_all(dir) {
        tracing::warn!(dir = %dir.display(), "could not create directory: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_path_lives_in_data_dir() {
        let cfg = Config::new("data", "exports");
        assert_eq!(cfg.db_path(), PathBuf::from("data").join("data_store.db"));
    }

    #[test]
    fn ensure_dirs_creates_both() {
        let root = tempfile::tempdir().expect("tempdir");
        let cfg = Config::new(root.path().join("d"), root.path().join("e/x"));
        cfg.ensure_dirs();
        assert!(cfg.data_dir.is_dir());
        assert!(cfg.export_dir.is_dir());
    }

    #[test]
    fn ensure_dirs_tolerates_failure() {
        let root = tempfile::tempdir().expect("tempdir");
        let file = root.path().join("taken");
        std::fs::write(&file, "x").unwrap();
        let cfg = Config::new(file.join("sub"), root.path().join("e"));
        cfg.ensure_dirs();
        assert!(!cfg.data_dir.exists());
        assert!(cfg.export_dir.is_dir());
    }
}
