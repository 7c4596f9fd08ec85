//! Operator-facing diagnostics.
//!
//! The terminal belongs to the UI while the app runs, so log records go to a
//! file instead of stderr. `RUST_LOG` controls the filter, default `info`.

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use anyhow::Result;
use env_logger::{Builder, Env, Target};

/// Start logging to `log_file`.
///
/// Logging is optional: if the file cannot be opened the app runs without a
/// logger and the returned error only describes why.
pub fn init(log_file: &Path) -> Result<()> {
    let file = open_log_file(log_file)?;

    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()?;

    Ok(())
}

fn open_log_file(log_file: &Path) -> Result<File> {
    if let Some(parent) = log_file.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("railchat.log");
        assert!(open_log_file(&path).is_ok());
        assert!(path.exists());
    }

    #[test]
    fn test_unopenable_log_file_is_an_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();

        assert!(open_log_file(&blocker.join("railchat.log")).is_err());
        assert!(init(&blocker.join("railchat.log")).is_err());
    }
}
