//! Per-identity build locks.
//!
//! Two evaluations with the same package identity must not build at the same
//! time, in this process or another one. Each identity gets its own lock file
//! under `<store>/locks/`; acquiring it blocks until the holder drops it. The
//! holder's metadata is written into the file for diagnostics.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
  pub version: u32,
  pub pid: u32,
  pub started_at_unix: u64,
  pub recipe: String,
}

#[derive(Debug, Error)]
pub enum LockError {
  #[error("failed to create lock directory {}: {source}", path.display())]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to open lock file {}: {source}", path.display())]
  OpenFile {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to acquire lock {}: {source}", path.display())]
  LockFailed {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("lock task did not complete: {0}")]
  Join(String),
}

/// Held exclusive lock. Released on drop.
#[derive(Debug)]
pub struct BuildLock {
  file: File,
  path: PathBuf,
}

impl BuildLock {
  /// Block until the lock at `path` is ours.
  pub fn acquire_blocking(path: &Path, recipe: &str) -> Result<Self, LockError> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(|source| LockError::CreateDir {
        path: parent.to_path_buf(),
        source,
      })?;
    }

    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(path)
      .map_err(|source| LockError::OpenFile {
        path: path.to_path_buf(),
        source,
      })?;

    lock_exclusive(&file).map_err(|source| LockError::LockFailed {
      path: path.to_path_buf(),
      source,
    })?;
    debug!(path = ?path, "acquired build lock");

    write_metadata(&file, recipe)?;
    Ok(Self {
      file,
      path: path.to_path_buf(),
    })
  }

  /// Acquire without blocking the async runtime.
  pub async fn acquire(path: &Path, recipe: &str) -> Result<Self, LockError> {
    let path = path.to_path_buf();
    let recipe = recipe.to_string();
    tokio::task::spawn_blocking(move || Self::acquire_blocking(&path, &recipe))
      .await
      .map_err(|e| LockError::Join(e.to_string()))?
  }

  /// Reads metadata through the held handle; opening a second handle fails on
  /// Windows while the lock is held.
  pub fn read_metadata(&self) -> io::Result<LockMetadata> {
    let mut file = &self.file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

fn write_metadata(file: &File, recipe: &str) -> Result<(), LockError> {
  let metadata = LockMetadata {
    version: 1,
    pid: std::process::id(),
    started_at_unix: SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .unwrap_or_default()
      .as_secs(),
    recipe: recipe.to_string(),
  };

  file.set_len(0).map_err(LockError::WriteMetadata)?;
  let mut writer = io::BufWriter::new(file);
  writer.seek(SeekFrom::Start(0)).map_err(LockError::WriteMetadata)?;
  serde_json::to_writer_pretty(&mut writer, &metadata).map_err(|e| LockError::WriteMetadata(io::Error::other(e)))?;
  writer.flush().map_err(LockError::WriteMetadata)?;
  Ok(())
}

#[cfg(unix)]
fn lock_exclusive(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::LockExclusive).map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn lock_exclusive(file: &File) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::HANDLE;
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LockFileEx};
  use windows_sys::Win32::System::IO::OVERLAPPED;

  let handle = file.as_raw_handle() as HANDLE;

  // SAFETY: OVERLAPPED is a plain data struct that is valid when zero-initialized,
  // and the handle stays open for the duration of the call.
  let result = unsafe {
    let mut overlapped: OVERLAPPED = std::mem::zeroed();
    LockFileEx(handle, LOCKFILE_EXCLUSIVE_LOCK, 0, 1, 0, &mut overlapped)
  };

  if result == 0 {
    Err(io::Error::last_os_error())
  } else {
    Ok(())
  }
}
