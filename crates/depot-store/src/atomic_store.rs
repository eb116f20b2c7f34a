//! Lock-scoped atomic mutation helpers for JSONL files.
//!
//! A mutation takes an exclusive `<path>.lock` file, reloads the records,
//! applies the mutator and persists before releasing the lock. Concurrent
//! writers (in-process or across processes) serialize on the lock file;
//! readers see whole files because writes go through rename.

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::error::Error as StdError;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::jsonl::{JsonlError, read_records_or_empty, write_records_to_path};

/// Attempts made to take a busy lock before giving up.
pub const LOCK_ACQUIRE_ATTEMPTS: u32 = 50;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(20);

pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut lock: OsString = path.as_os_str().to_os_string();
    lock.push(".lock");
    PathBuf::from(lock)
}

#[derive(Debug)]
pub enum AtomicStoreMutationError<E> {
    LockBusy { lock_path: String },
    LockIo { lock_path: String, message: String },
    Store(JsonlError),
    Mutation(E),
}

impl<E> AtomicStoreMutationError<E> {
    fn lock_busy(lock_path: &Path) -> Self {
        Self::LockBusy {
            lock_path: lock_path.display().to_string(),
        }
    }

    fn lock_io(lock_path: &Path, message: impl Into<String>) -> Self {
        Self::LockIo {
            lock_path: lock_path.display().to_string(),
            message: message.into(),
        }
    }
}

impl AtomicStoreMutationError<Infallible> {
    fn widen<F>(self) -> AtomicStoreMutationError<F> {
        match self {
            Self::LockBusy { lock_path } => AtomicStoreMutationError::LockBusy { lock_path },
            Self::LockIo { lock_path, message } => {
                AtomicStoreMutationError::LockIo { lock_path, message }
            }
            Self::Store(source) => AtomicStoreMutationError::Store(source),
            Self::Mutation(unreachable) => match unreachable {},
        }
    }
}

impl<E: Display> Display for AtomicStoreMutationError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LockBusy { lock_path } => write!(f, "store lock busy: {lock_path}"),
            Self::LockIo { lock_path, message } => {
                write!(f, "failed to acquire store lock {lock_path}: {message}")
            }
            Self::Store(err) => write!(f, "{err}"),
            Self::Mutation(err) => write!(f, "{err}"),
        }
    }
}

impl<E> StdError for AtomicStoreMutationError<E> where
    E: Display + std::fmt::Debug + StdError + 'static
{
}

/// Execute one lock-scoped mutation against a JSONL file of `R` records.
///
/// The mutator returns `(value, changed)` where:
/// - `value` is returned to the caller
/// - `changed=true` persists the records before lock release.
pub fn mutate_jsonl<R, T, E, F>(
    path: impl AsRef<Path>,
    mutator: F,
) -> Result<T, AtomicStoreMutationError<E>>
where
    R: Serialize + DeserializeOwned,
    F: FnOnce(&mut Vec<R>) -> Result<(T, bool), E>,
{
    let path = path.as_ref();
    let _guard =
        FileLockGuard::acquire(&lock_path_for(path)).map_err(AtomicStoreMutationError::widen)?;

    let mut records: Vec<R> =
        read_records_or_empty(path).map_err(AtomicStoreMutationError::Store)?;
    let (value, changed) = mutator(&mut records).map_err(AtomicStoreMutationError::Mutation)?;
    if changed {
        write_records_to_path(path, &records).map_err(AtomicStoreMutationError::Store)?;
    }
    Ok(value)
}

/// Exclusive lock file, removed on drop.
pub struct FileLockGuard {
    lock_path: PathBuf,
    _file: File,
}

impl FileLockGuard {
    /// Take the lock, retrying briefly while another writer holds it.
    pub fn acquire(
        lock_path: &Path,
    ) -> Result<Self, AtomicStoreMutationError<Infallible>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match Self::try_acquire(lock_path) {
                Err(AtomicStoreMutationError::LockBusy { .. })
                    if attempt < LOCK_ACQUIRE_ATTEMPTS =>
                {
                    thread::sleep(LOCK_RETRY_DELAY);
                }
                other => return other,
            }
        }
    }

    fn try_acquire(
        lock_path: &Path,
    ) -> Result<Self, AtomicStoreMutationError<Infallible>> {
        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| AtomicStoreMutationError::lock_io(lock_path, e.to_string()))?;
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(lock_path)
        {
            Ok(mut file) => {
                let _ = writeln!(
                    file,
                    "pid={}\nutc={}",
                    std::process::id(),
                    Utc::now().to_rfc3339()
                );
                Ok(Self {
                    lock_path: lock_path.to_path_buf(),
                    _file: file,
                })
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(AtomicStoreMutationError::lock_busy(lock_path))
            }
            Err(err) => Err(AtomicStoreMutationError::lock_io(lock_path, err.to_string())),
        }
    }
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_kernel::{ProjectVersion, VersionRecord};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let root = std::env::temp_dir().join(format!("depot-store-{prefix}-{unique}"));
        fs::create_dir_all(&root).expect("temp dir should be created");
        root.join("versions.jsonl")
    }

    #[test]
    fn mutation_persists_only_when_changed() {
        let path = temp_path("changed");
        let untouched: usize = mutate_jsonl::<VersionRecord, _, Infallible, _>(
            &path,
            |records| Ok((records.len(), false)),
        )
        .expect("read-only mutation should succeed");
        assert_eq!(untouched, 0);
        assert!(!path.exists());

        mutate_jsonl::<VersionRecord, _, Infallible, _>(&path, |records| {
            records.push(VersionRecord::new(
                "p-1",
                ProjectVersion::new("org.acme", "core", "1.0"),
            ));
            Ok(((), true))
        })
        .expect("write mutation should succeed");
        assert!(path.exists());
        assert!(!lock_path_for(&path).exists());
    }

    #[test]
    fn mutation_reports_busy_lock() {
        let path = temp_path("busy");
        let lock_path = lock_path_for(&path);
        fs::write(&lock_path, "busy\n").expect("lock should be created");

        let result = mutate_jsonl::<VersionRecord, (), Infallible, _>(&path, |_| {
            Ok(((), false))
        });
        match result {
            Err(AtomicStoreMutationError::LockBusy {
                lock_path: reported,
            }) => assert_eq!(reported, lock_path.display().to_string()),
            other => panic!("expected lock busy error, got {other:?}"),
        }
        let _ = fs::remove_file(lock_path);
    }

    #[test]
    fn mutation_error_leaves_file_untouched() {
        let path = temp_path("mutation-error");
        let result = mutate_jsonl::<VersionRecord, (), String, _>(&path, |records| {
            records.push(VersionRecord::new(
                "p-1",
                ProjectVersion::new("org.acme", "core", "1.0"),
            ));
            Err("rejected".to_string())
        });
        assert!(matches!(result, Err(AtomicStoreMutationError::Mutation(message)) if message == "rejected"));
        assert!(!path.exists());
    }
}
