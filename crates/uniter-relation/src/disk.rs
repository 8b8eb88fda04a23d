use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, WriteError};

/// On-disk record for a single relation member.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct DiskInfo {
    #[serde(rename = "change-version", default)]
    pub change_version: Option<i64>,
    #[serde(rename = "changed-pending", default, skip_serializing_if = "is_false")]
    pub changed_pending: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

pub(crate) fn read_unit_file(path: &Path, file: &str) -> Result<DiskInfo, LoadError> {
    let contents = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&contents).map_err(|source| LoadError::InvalidUnitFile {
        file: file.to_string(),
        source,
    })
}

/// Replace `path` with the encoded record so that a crash leaves either the
/// old or the new content, never a partial file.
pub(crate) fn write_unit_file(path: &Path, info: &DiskInfo) -> Result<(), WriteError> {
    let contents = serde_yaml::to_string(info).map_err(WriteError::Encode)?;
    let dir = path.parent().ok_or_else(|| WriteError::Io {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "unit file has no parent directory"),
    })?;
    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|source| io_err(dir, source))?;
    temp.write_all(contents.as_bytes())
        .map_err(|source| io_err(temp.path(), source))?;
    temp.as_file()
        .sync_all()
        .map_err(|source| io_err(temp.path(), source))?;
    temp.persist(path).map_err(|e| WriteError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    fsync_dir(dir)
}

/// Remove a file, treating "already gone" as success.
pub(crate) fn remove_file(path: &Path) -> Result<(), WriteError> {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(source) => return Err(io_err(path, source)),
    }
    match path.parent() {
        Some(dir) => fsync_dir(dir),
        None => Ok(()),
    }
}

/// Remove a whole directory tree without ever exposing a half-deleted
/// directory under its original name.
///
/// The directory is first renamed to `tombstone` (which must live in the same
/// parent), then removed. Stale tombstones from an interrupted earlier attempt
/// are cleared first. A missing `path` is success.
pub(crate) fn remove_dir(path: &Path, tombstone: &Path) -> Result<(), WriteError> {
    remove_tree(tombstone)?;
    match fs::rename(path, tombstone) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(source) => return Err(io_err(path, source)),
    }
    if let Some(parent) = path.parent() {
        fsync_dir(parent)?;
    }
    remove_tree(tombstone)
}

fn remove_tree(path: &Path) -> Result<(), WriteError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(io_err(path, source)),
    }
}

fn io_err(path: &Path, source: io::Error) -> WriteError {
    WriteError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(unix)]
fn fsync_dir(path: &Path) -> Result<(), WriteError> {
    let dir = File::open(path).map_err(|source| io_err(path, source))?;
    dir.sync_all().map_err(|source| io_err(path, source))
}

#[cfg(not(unix))]
fn fsync_dir(_path: &Path) -> Result<(), WriteError> {
    Ok(())
}
