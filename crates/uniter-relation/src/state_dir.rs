use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use uniter_types::{HookInfo, HookKind, RelationId, unit_file_name, unit_from_file_name};

use crate::disk::{self, DiskInfo};
use crate::error::{LoadError, StateDirError, WriteError};
use crate::state::RelationState;

/// Filesystem-backed state of a single relation.
///
/// The directory holds one record file per member unit. The cached state is
/// kept in sync with the directory as long as this value is its only writer;
/// concurrent modification of the directory has undefined results.
#[derive(Debug)]
pub struct StateDir {
    path: PathBuf,
    state: RelationState,
}

impl StateDir {
    /// Loads the state persisted in `root/<relation_id>`.
    ///
    /// A missing directory is not an error and yields an empty state.
    /// Entries whose names are not `<service>-<number>` are ignored.
    pub fn read(root: &Path, relation_id: RelationId) -> Result<Self, StateDirError> {
        let path = root.join(relation_id.to_string());
        let state = load_state(&path, relation_id).map_err(|source| StateDirError::Load {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(
            relation_id,
            path = %path.display(),
            members = state.members().map_or(0, |m| m.len()),
            "loaded relation state"
        );
        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cached state, reflecting every successful [`StateDir::write`].
    pub fn state(&self) -> &RelationState {
        &self.state
    }

    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }

    /// Creates the directory (and missing parents) if it does not exist yet.
    pub fn ensure(&self) -> Result<(), StateDirError> {
        fs::create_dir_all(&self.path).map_err(|source| StateDirError::Ensure {
            relation_id: self.state.relation_id(),
            path: self.path.clone(),
            source,
        })
    }

    /// Durably records the effect of `hi`, then updates the cached state.
    ///
    /// Must only be called after the hook ran successfully. `hi` is not
    /// validated, but writing the same hook twice in a row is idempotent, so
    /// a hook re-delivered after a crash can be recorded again safely. On
    /// error the cached state is left unchanged.
    pub fn write(&mut self, hi: &HookInfo) -> Result<(), StateDirError> {
        self.persist(hi).map_err(|source| StateDirError::Write {
            relation_id: self.state.relation_id(),
            kind: hi.kind,
            unit: hi.remote_unit.clone(),
            source,
        })?;
        self.state.apply(hi);
        tracing::debug!(
            relation_id = self.state.relation_id(),
            kind = %hi.kind,
            unit = %hi.remote_unit,
            change_version = hi.change_version,
            "recorded relation hook"
        );
        Ok(())
    }

    fn persist(&self, hi: &HookInfo) -> Result<(), WriteError> {
        if hi.kind == HookKind::RelationBroken {
            return disk::remove_dir(&self.path, &self.tombstone_path());
        }
        let path = self.path.join(unit_file_name(&hi.remote_unit)?);
        if hi.kind == HookKind::RelationDeparted {
            return disk::remove_file(&path);
        }
        let info = DiskInfo {
            change_version: Some(hi.change_version),
            changed_pending: hi.kind == HookKind::RelationJoined,
        };
        disk::write_unit_file(&path, &info)
    }

    /// Sibling of the relation directory whose name can never parse as a
    /// relation id.
    fn tombstone_path(&self) -> PathBuf {
        let name = format!(".{}.broken", self.state.relation_id());
        match self.path.parent() {
            Some(root) => root.join(name),
            None => PathBuf::from(name),
        }
    }
}

fn load_state(path: &Path, relation_id: RelationId) -> Result<RelationState, LoadError> {
    let io_err = |source: io::Error| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(RelationState::new(relation_id)),
        Err(e) => return Err(io_err(e)),
    };

    let mut members = BTreeMap::new();
    let mut changed_pending: Option<String> = None;
    for entry in entries {
        let entry = entry.map_err(io_err)?;
        let file_name = entry.file_name();
        let Some(file) = file_name.to_str() else {
            continue;
        };
        // Only `<service>-<number>` entries hold unit data; anything else
        // may be unrelated metadata and is skipped.
        let Some(unit) = unit_from_file_name(file) else {
            continue;
        };
        if entry.file_type().map_err(io_err)?.is_dir() {
            continue;
        }
        let info = disk::read_unit_file(&entry.path(), file)?;
        let Some(change_version) = info.change_version else {
            return Err(LoadError::MissingChangeVersion {
                file: file.to_string(),
            });
        };
        if info.changed_pending {
            if let Some(first) = changed_pending.take() {
                return Err(LoadError::DuplicateChangedPending {
                    first,
                    second: unit,
                });
            }
            changed_pending = Some(unit.clone());
        }
        members.insert(unit, change_version);
    }
    Ok(RelationState::from_parts(relation_id, members, changed_pending))
}

/// Loads every relation state directory directly inside `root`.
///
/// Only entries named with a non-negative integer are treated as relations.
/// A missing `root` yields an empty map. The first load failure aborts the
/// whole operation.
pub fn read_all_state_dirs(root: &Path) -> Result<BTreeMap<RelationId, StateDir>, StateDirError> {
    let wrap = |source: StateDirError| StateDirError::LoadAll {
        root: root.to_path_buf(),
        source: Box::new(source),
    };
    let io_err = |source: io::Error| {
        wrap(StateDirError::Load {
            path: root.to_path_buf(),
            source: LoadError::Io {
                path: root.to_path_buf(),
                source,
            },
        })
    };
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(io_err(e)),
    };

    let mut dirs = BTreeMap::new();
    for entry in entries {
        let entry = entry.map_err(io_err)?;
        let file_name = entry.file_name();
        // Relations live in directories named by their decimal id; every
        // other name is unrelated and skipped.
        let Some(name) = file_name
            .to_str()
            .filter(|name| name.bytes().all(|b| b.is_ascii_digit()))
        else {
            continue;
        };
        let relation_id = name.parse::<RelationId>().map_err(|_| {
            wrap(StateDirError::Load {
                path: entry.path(),
                source: LoadError::InvalidRelationId {
                    name: name.to_string(),
                },
            })
        })?;
        let dir = StateDir::read(root, relation_id).map_err(wrap)?;
        dirs.insert(relation_id, dir);
    }
    tracing::info!(root = %root.display(), relations = dirs.len(), "loaded relation state directories");
    Ok(dirs)
}
