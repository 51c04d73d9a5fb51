//! Persistent client identifier.
//!
//! Each run of the client takes the next number from a small counter file so
//! identifiers keep increasing across process restarts.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ProtocolError, Result};

#[derive(Debug, Clone)]
pub struct ClientIdCounter {
    path: PathBuf,
}

impl ClientIdCounter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the next identifier.
    ///
    /// A missing file is created holding `1`, and `1` is returned. Otherwise
    /// the stored value is incremented, written back over the old contents and
    /// returned.
    pub fn next_id(&self) -> Result<i64> {
        let mut file = match OpenOptions::new().read(true).write(true).open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::write(&self.path, "1")?;
                debug!(path = %self.path.display(), "Created client id file");
                return Ok(1);
            }
            Err(e) => return Err(e.into()),
        };

        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let current: i64 = contents.trim().parse().map_err(|_| {
            ProtocolError::Config(format!(
                "Client id file {} does not hold an integer: '{}'",
                self.path.display(),
                contents.trim()
            ))
        })?;

        let next = current + 1;
        file.seek(SeekFrom::Start(0))?;
        file.set_len(0)?;
        file.write_all(next.to_string().as_bytes())?;
        file.flush()?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_run_creates_file_with_one() {
        let dir = TempDir::new().unwrap();
        let counter = ClientIdCounter::new(dir.path().join("counter"));

        assert_eq!(counter.next_id().unwrap(), 1);
        assert_eq!(fs::read_to_string(counter.path()).unwrap(), "1");
    }

    #[test]
    fn later_runs_increment_and_truncate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counter");
        fs::write(&path, "99").unwrap();
        let counter = ClientIdCounter::new(&path);

        assert_eq!(counter.next_id().unwrap(), 100);
        assert_eq!(counter.next_id().unwrap(), 101);
        assert_eq!(fs::read_to_string(&path).unwrap(), "101");
    }

    #[test]
    fn garbage_contents_are_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counter");
        fs::write(&path, "seven").unwrap();

        let result = ClientIdCounter::new(&path).next_id();
        assert!(matches!(result, Err(ProtocolError::Config(_))));
    }
}
