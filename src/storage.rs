//! Durable storage for the three session files.
//!
//! All files live flat inside the configured data directory:
//!
//! | File | Mode |
//! |------|------|
//! | `extracted_content.txt` | overwritten each upload |
//! | `summary_and_key_points.txt` | overwritten with the latest summary |
//! | `chat_history.txt` | append-only |
//!
//! Single-writer assumption: concurrent sessions sharing one data directory
//! race on these paths, and no locking is attempted.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const EXTRACTED_CONTENT_FILE: &str = "extracted_content.txt";
pub const SUMMARY_FILE: &str = "summary_and_key_points.txt";
pub const CHAT_HISTORY_FILE: &str = "chat_history.txt";

/// Handle on the data directory. Cheap to clone; holds no open files.
#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    /// Creates a handle, creating the directory if it does not exist.
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Writes `text` to the named file, overwriting or appending.
    /// Failure is fatal to the triggering action; nothing is retried.
    pub fn save_text(&self, text: &str, name: &str, append: bool) -> Result<()> {
        let path = self.path(name);
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        file.write_all(text.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Reads the named file as UTF-8.
    pub fn read_text(&self, name: &str) -> Result<String> {
        let path = self.path(name);
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    /// Reads the named file, or `None` if it does not exist yet.
    pub fn read_text_opt(&self, name: &str) -> Result<Option<String>> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(None);
        }
        self.read_text(name).map(Some)
    }
}
