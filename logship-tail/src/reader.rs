//! Polling follower for a single append-only log file.
//!
//! The reader starts at end-of-file: lines written before [`TailReader::open`]
//! are never returned. Each call to [`LineSource::next_line`] yields at most
//! one complete, newline-terminated line; an unterminated tail is buffered
//! until its newline arrives. Lines that are not valid UTF-8 are handed
//! back untouched as [`ReadOutcome::Invalid`].
//!
//! The file is only ever opened for reading; [`LineSource::truncate`] opens
//! a short-lived write handle, so a file this process may read but not
//! write can still be followed.
//!
//! Truncation is expected to be done through this reader. If another process
//! shrinks the file the reader notices that the length dropped below its
//! cursor and restarts from offset 0. Replacing the file (rename + create) is
//! not detected: the reader keeps following the old inode.

use crate::error::TailError;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of a single read attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete line, without its terminator.
    Line(String),
    /// A complete line that is not valid UTF-8, without its terminator.
    Invalid(Vec<u8>),
    /// No complete line is available yet; poll again later.
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailState {
    /// Cursor positioned, ready to read.
    Following,
    /// File emptied, cursor reset still pending.
    Truncating,
}

/// A source of newly appended lines.
pub trait LineSource {
    fn next_line(&mut self) -> Result<ReadOutcome, TailError>;

    /// Empty the underlying file and reset the cursor to zero.
    fn truncate(&mut self) -> Result<(), TailError>;

    /// Bytes consumed as complete lines.
    fn cursor(&self) -> u64;
}

pub struct TailReader {
    path: PathBuf,
    reader: BufReader<File>,
    cursor: u64,
    pending: Vec<u8>,
    state: TailState,
}

impl TailReader {
    /// Open `path` for reading and position the cursor at end-of-file.
    pub fn open(path: &Path) -> Result<Self, TailError> {
        let open_err = |source| TailError::Open {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(open_err)?;
        let mut reader = BufReader::new(file);
        let cursor = reader.seek(SeekFrom::End(0)).map_err(open_err)?;

        info!(path = %path.display(), offset = cursor, "Following log file from end");

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            cursor,
            pending: Vec::new(),
            state: TailState::Following,
        })
    }

    pub fn state(&self) -> TailState {
        self.state
    }

    /// Move back to offset 0, dropping any buffered partial line.
    fn rewind(&mut self) -> Result<(), TailError> {
        self.reader
            .seek(SeekFrom::Start(0))
            .map_err(TailError::Read)?;
        self.cursor = 0;
        self.pending.clear();
        self.state = TailState::Following;
        Ok(())
    }

    /// True when the file is now shorter than what we have already read.
    fn shrunk_externally(&self) -> Result<bool, TailError> {
        let len = self
            .reader
            .get_ref()
            .metadata()
            .map_err(TailError::Read)?
            .len();
        Ok(len < self.cursor + self.pending.len() as u64)
    }
}

impl LineSource for TailReader {
    fn next_line(&mut self) -> Result<ReadOutcome, TailError> {
        if self.state == TailState::Truncating {
            self.rewind()?;
        }

        self.reader
            .read_until(b'\n', &mut self.pending)
            .map_err(TailError::Read)?;

        if self.pending.last() == Some(&b'\n') {
            let mut raw = std::mem::take(&mut self.pending);
            self.cursor += raw.len() as u64;

            raw.pop();
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
            return Ok(match String::from_utf8(raw) {
                Ok(line) => ReadOutcome::Line(line),
                Err(e) => ReadOutcome::Invalid(e.into_bytes()),
            });
        }

        if self.shrunk_externally()? {
            warn!(
                path = %self.path.display(),
                offset = self.cursor,
                "Log file shrank underneath the reader; restarting from offset 0"
            );
            self.rewind()?;
        }

        Ok(ReadOutcome::Pending)
    }

    fn truncate(&mut self) -> Result<(), TailError> {
        OpenOptions::new()
            .write(true)
            .open(&self.path)
            .and_then(|file| file.set_len(0))
            .map_err(TailError::Truncate)?;
        self.state = TailState::Truncating;
        self.rewind()?;
        debug!(path = %self.path.display(), "Log file truncated");
        Ok(())
    }

    fn cursor(&self) -> u64 {
        self.cursor
    }
}
