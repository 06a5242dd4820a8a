//! Append-only JSONL log writers (spec.md §5/§6). Teacher's own code
//! favors `tracing` for everything and has no durable line-append log
//! (the closest analog, `SessionStore::save`, rewrites a whole file
//! atomically instead); this is a `std::fs`-based writer built in the
//! teacher's plain, no-framework style, with `fs2` advisory locking
//! around each line write per spec.md §5 ("Log files are append-only
//! with exclusive advisory locking around each line write").

use fs2::FileExt;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct LogWriter {
    file: Mutex<File>,
}

impl LogWriter {
    /// Opens (creating if needed) the log file at `path`, creating its
    /// parent directory with mode 0755 on first write (spec.md §6).
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path: PathBuf = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let _ = fs::set_permissions(parent, fs::Permissions::from_mode(0o755));
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(LogWriter { file: Mutex::new(file) })
    }

    pub fn append_json<T: Serialize>(&self, record: &T) {
        let Ok(mut line) = serde_json::to_string(record) else {
            tracing::error!("failed to serialize log record");
            return;
        };
        line.push('\n');

        let file = self.file.lock().expect("log file lock poisoned");
        if let Err(e) = file.lock_exclusive() {
            tracing::warn!(error = %e, "failed to acquire advisory file lock");
        }
        let mut handle = &*file;
        if let Err(e) = handle.write_all(line.as_bytes()) {
            tracing::error!(error = %e, "failed to append log line");
        }
        let _ = file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn append_json_creates_parent_dir_and_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/log/ps_parse.log");
        let writer = LogWriter::open(&path).unwrap();
        writer.append_json(&json!({"a": 1}));
        writer.append_json(&json!({"a": 2}));

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"a\":1"));
        assert!(lines[1].contains("\"a\":2"));
    }
}
