//! Task snapshot reading and parsing

use std::fs;
use std::path::{Path, PathBuf};

use glob::glob;
use log::{debug, warn};
use serde_json::Value;

use crate::tracking::config::get_data_dir;
use crate::tracking::models::Task;

/// Error type for reader operations
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Directory not found: {0}")]
    DirNotFound(String),
    #[error("Unexpected snapshot layout in {0}")]
    InvalidLayout(String),
}

/// List snapshot files (`*.json`, excluding `config.json`) in a data directory
pub fn list_snapshot_files(data_dir: &Path) -> Result<Vec<PathBuf>, ReaderError> {
    if !data_dir.is_dir() {
        return Err(ReaderError::DirNotFound(
            data_dir.to_string_lossy().to_string(),
        ));
    }

    let pattern = data_dir.join("*.json");
    let mut files: Vec<PathBuf> = glob(pattern.to_string_lossy().as_ref())
        .map(|paths| paths.filter_map(Result::ok).collect())
        .unwrap_or_default();

    files.retain(|path| path.file_name().and_then(|n| n.to_str()) != Some("config.json"));
    files.sort();
    Ok(files)
}

/// Parse the tasks of one snapshot document.
///
/// The document is either an array of tasks or an object with a `tasks`
/// array. Records that fail to deserialize are skipped.
pub fn parse_snapshot(contents: &str, origin: &str) -> Result<Vec<Task>, ReaderError> {
    let document: Value = serde_json::from_str(contents)?;

    let records = match document {
        Value::Array(records) => records,
        Value::Object(mut object) => match object.remove("tasks") {
            Some(Value::Array(records)) => records,
            _ => return Err(ReaderError::InvalidLayout(origin.to_string())),
        },
        _ => return Err(ReaderError::InvalidLayout(origin.to_string())),
    };

    let mut tasks = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<Task>(record) {
            Ok(task) => tasks.push(task),
            Err(e) => {
                debug!("Skipping task record {} in {}: {}", index, origin, e);
            }
        }
    }

    Ok(tasks)
}

/// Read all tasks from a snapshot file
pub fn read_snapshot_file(path: &Path) -> Result<Vec<Task>, ReaderError> {
    let contents = fs::read_to_string(path)?;
    parse_snapshot(&contents, &path.to_string_lossy())
}

/// Load every task from the data directory. Unreadable files are logged
/// and skipped.
pub fn load_all_tasks(custom_path: Option<&str>) -> Result<Vec<Task>, ReaderError> {
    let data_dir = get_data_dir(custom_path);
    let files = list_snapshot_files(&data_dir)?;

    let mut tasks = Vec::new();
    for file in &files {
        match read_snapshot_file(file) {
            Ok(mut loaded) => {
                debug!("Loaded {} tasks from {:?}", loaded.len(), file);
                tasks.append(&mut loaded);
            }
            Err(e) => {
                warn!("Failed to read snapshot file {:?}: {}", file, e);
            }
        }
    }

    Ok(tasks)
}
