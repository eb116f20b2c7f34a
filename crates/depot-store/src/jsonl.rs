//! JSONL storage: one record per line.
//!
//! The portable persistence format for versions, projects, queued events
//! and archived notifications. Files are replaced atomically on write.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Read records from a JSONL reader. Blank and `#` lines are skipped.
pub fn read_records<T: DeserializeOwned>(reader: impl BufRead) -> Result<Vec<T>, JsonlError> {
    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| JsonlError::Io(line_no + 1, e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let record: T = serde_json::from_str(trimmed)
            .map_err(|e| JsonlError::Parse(line_no + 1, e.to_string()))?;
        records.push(record);
    }
    Ok(records)
}

/// Write records to a JSONL writer.
pub fn write_records<T: Serialize>(
    writer: &mut impl Write,
    records: &[T],
) -> Result<(), JsonlError> {
    for record in records {
        let line =
            serde_json::to_string(record).map_err(|e| JsonlError::Serialize(e.to_string()))?;
        writeln!(writer, "{line}").map_err(|e| JsonlError::Io(0, e.to_string()))?;
    }
    Ok(())
}

/// Read records from a JSONL file path.
pub fn read_records_from_path<T: DeserializeOwned>(
    path: impl AsRef<Path>,
) -> Result<Vec<T>, JsonlError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| io_error(path, e))?;
    read_records(decode_file(path, &bytes)?.as_bytes())
}

/// Like [`read_records_from_path`], but a missing file reads as empty.
pub fn read_records_or_empty<T: DeserializeOwned>(
    path: impl AsRef<Path>,
) -> Result<Vec<T>, JsonlError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }
    read_records_from_path(path)
}

/// Replace the file at `path` with `records`.
///
/// Records go to a sibling temp file that is fsynced, renamed over `path`,
/// and followed by an fsync of the parent directory. Readers see either the
/// old file or the new one, never a mix.
pub fn write_records_to_path<T: Serialize>(
    path: impl AsRef<Path>,
    records: &[T],
) -> Result<(), JsonlError> {
    let path = path.as_ref();
    let parent = path.parent().filter(|parent| !parent.as_os_str().is_empty());
    if let Some(parent) = parent {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }

    let tmp_path = tmp_write_path(path);
    let renamed = write_temp(&tmp_path, records)
        .and_then(|()| fs::rename(&tmp_path, path).map_err(|e| io_error(path, e)));
    if let Err(error) = renamed {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    match parent {
        Some(parent) => sync_dir(parent),
        None => Ok(()),
    }
}

fn write_temp<T: Serialize>(tmp_path: &Path, records: &[T]) -> Result<(), JsonlError> {
    let file = File::create(tmp_path).map_err(|e| io_error(tmp_path, e))?;
    let mut writer = BufWriter::new(file);
    write_records(&mut writer, records)?;
    let file = writer
        .into_inner()
        .map_err(|e| io_error(tmp_path, e.into_error()))?;
    file.sync_all().map_err(|e| io_error(tmp_path, e))
}

fn sync_dir(dir: &Path) -> Result<(), JsonlError> {
    File::open(dir)
        .and_then(|handle| handle.sync_all())
        .map_err(|e| io_error(dir, e))
}

fn io_error(path: &Path, error: std::io::Error) -> JsonlError {
    JsonlError::Io(0, format!("{}: {error}", path.display()))
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{unique}", std::process::id()));
    PathBuf::from(tmp)
}

/// Decode a whole store file before parsing any line of it.
///
/// A crash between allocation and flush can leave NUL-filled blocks in a
/// file; those bytes, and any non-UTF-8 run, mean the file is damaged, so it
/// is refused outright instead of being read up to the first bad line.
fn decode_file<'b>(path: &Path, bytes: &'b [u8]) -> Result<&'b str, JsonlError> {
    if let Some(offset) = bytes.iter().position(|byte| *byte == 0) {
        return Err(JsonlError::Corrupt(format!(
            "{}: NUL byte at offset {offset}",
            path.display()
        )));
    }
    std::str::from_utf8(bytes).map_err(|e| {
        JsonlError::Corrupt(format!(
            "{}: invalid UTF-8 at offset {}",
            path.display(),
            e.valid_up_to()
        ))
    })
}

/// Errors from JSONL operations.
#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("line {0}: I/O error: {1}")]
    Io(usize, String),

    #[error("line {0}: parse error: {1}")]
    Parse(usize, String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("corrupt JSONL file: {0}")]
    Corrupt(String),
}
