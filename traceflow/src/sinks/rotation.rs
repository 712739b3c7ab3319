//! Size-rotated log files.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Default rotation threshold: 1 GiB.
pub const DEFAULT_ROTATE_LENGTH: u64 = 1024 * 1024 * 1024;

/// Default number of rotated files to keep.
pub const DEFAULT_MAX_ROTATED_FILES: usize = 10;

/// A log file that rotates when it grows past a size threshold.
///
/// Rotation shifts `path.1` (newest) through `path.N` (oldest); the file
/// beyond `max_rotated_files` is discarded. The active file is always at
/// `path` and is opened in append mode, so an existing file keeps growing
/// from its current size after a restart.
///
/// The rotation decision is made between `write` calls, so callers must
/// issue one write per record to keep records whole across rotations.
#[derive(Debug)]
pub struct RotatingLogFile {
    path: PathBuf,
    rotate_length: u64,
    max_rotated_files: usize,
    file: File,
    written: u64,
}

fn rotated_path(path: &Path, index: usize) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl RotatingLogFile {
    /// Opens (or creates) a rotating log file.
    pub fn open(
        path: impl Into<PathBuf>,
        rotate_length: u64,
        max_rotated_files: usize,
    ) -> io::Result<Self> {
        let path = path.into();
        let file = open_append(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path,
            rotate_length,
            max_rotated_files,
            file,
            written,
        })
    }

    /// Returns the path of the active file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        for index in (1..self.max_rotated_files).rev() {
            let from = rotated_path(&self.path, index);
            if from.exists() {
                // Renaming over path.{index + 1} discards the oldest file
                // once the cap is reached.
                fs::rename(&from, rotated_path(&self.path, index + 1))?;
            }
        }
        fs::rename(&self.path, rotated_path(&self.path, 1))?;
        self.file = open_append(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl Write for RotatingLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Rotate before the write that would cross the threshold; a single
        // record larger than the threshold still lands in one file.
        if self.written > 0 && self.written + buf.len() as u64 > self.rotate_length {
            self.rotate()?;
        }
        let count = self.file.write(buf)?;
        self.written += count as u64;
        Ok(count)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
