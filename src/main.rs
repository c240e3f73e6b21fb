mod calc;
mod config;
mod db;
mod export;
mod filter;
mod ipc;
mod journal;
mod model;
mod reports;
mod shell;
mod table;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "gradebook", version, about = "Student grade book with attempt tracking")]
struct Args {
    /// Directory holding the database file
    #[arg(long, env = "GRADEBOOK_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Directory CSV exports are written to
    #[arg(long, env = "GRADEBOOK_EXPORT_DIR", default_value = "exports")]
    export_dir: PathBuf,

    /// Speak the JSON-lines command protocol on stdin/stdout instead of the menu
    #[arg(long)]
    stdio: bool,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gradebook={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_state(config: &Config) -> ipc::AppState {
    let db_path = config.db_path();
    let existed = db_path.is_file();
    let mut save_blocked = None;
    let store = match db::load_store(&db_path) {
        Ok(loaded) => {
            if !loaded.existed {
                tracing::info!(path = %db_path.display(), "no database yet, starting empty");
            }
            if loaded.repairs.orphan_grades_dropped > 0 {
                tracing::warn!(
                    count = loaded.repairs.orphan_grades_dropped,
                    "dropped grades pointing at missing students or subjects"
                );
            }
            if loaded.skipped_rows > 0 {
                tracing::warn!(count = loaded.skipped_rows, "skipped unreadable rows");
            }
            if loaded.repairs.students_ungrouped > 0 {
                tracing::warn!(
                    count = loaded.repairs.students_ungrouped,
                    "cleared references to missing groups"
                );
            }
            tracing::info!(
                students = loaded.store.students().len(),
                grades = loaded.store.grades().len(),
                "store loaded"
            );
            loaded.store
        }
        Err(e) if existed => {
            tracing::error!(
                path = %db_path.display(),
                "could not load database, starting empty with saving disabled: {e:#}"
            );
            save_blocked = Some(format!("{} could not be loaded", db_path.display()));
            model::DataStore::default()
        }
        Err(e) => {
            tracing::warn!(path = %db_path.display(), "could not open database, starting empty: {e:#}");
            model::DataStore::default()
        }
    };
    let mut state = ipc::AppState::new(store, config);
    state.save_blocked = save_blocked;
    state
}

fn run_stdio(state: &mut ipc::AppState) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(state, req),
            Err(e) => ipc::bad_json(e.to_string()),
        };
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    if let Err(e) = state.save() {
        tracing::warn!(path = %state.db_path.display(), "final save failed: {e:#}");
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = Config::new(args.data_dir, args.export_dir);
    config.ensure_dirs();
    let mut state = load_state(&config);

    if args.stdio {
        run_stdio(&mut state);
        return;
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut shell = shell::Shell::new(&mut state, stdin.lock(), stdout.lock());
    if let Err(e) = shell.run() {
        tracing::warn!("console error: {e}");
    }
}
