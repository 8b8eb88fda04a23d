use std::path::PathBuf;

use uniter_types::{HookKind, RelationId};

/// Describes why a hook may not run against the current relation state.
///
/// Variants are listed in the order [`RelationState::validate`] checks them.
///
/// [`RelationState::validate`]: crate::RelationState::validate
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelationViolation {
    /// The hook belongs to a different relation.
    WrongRelation {
        expected: RelationId,
        actual: RelationId,
    },
    /// `relation-broken` was already recorded; nothing may follow it.
    RelationAlreadyBroken,
    /// `relation-broken` requires every unit to have departed.
    UnitsStillPresent,
    /// A unit joined and its first `relation-changed` has not run yet.
    PendingChangeRequired { pending: String },
    /// `relation-joined` for a unit that is already a member.
    AlreadyJoined,
    /// Any hook other than `relation-joined` for a unit that is not a member.
    NotJoined,
}

impl std::fmt::Display for RelationViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongRelation { expected, actual } => {
                write!(f, "expected relation {expected}, got relation {actual}")
            }
            Self::RelationAlreadyBroken => {
                write!(f, "relation is broken and cannot be changed further")
            }
            Self::UnitsStillPresent => {
                write!(f, "cannot run \"relation-broken\" while units still present")
            }
            Self::PendingChangeRequired { pending } => {
                write!(f, "expected \"relation-changed\" for {pending:?}")
            }
            Self::AlreadyJoined => write!(f, "unit already joined"),
            Self::NotJoined => write!(f, "unit has not joined"),
        }
    }
}

/// A hook rejected by validation, with the hook it was raised for.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("inappropriate \"{kind}\" for {unit:?}: {violation}")]
pub struct InappropriateHook {
    pub kind: HookKind,
    pub unit: String,
    pub violation: RelationViolation,
}

/// Errors produced while reconstructing a relation from its directory.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid unit file {file:?}: {source}")]
    InvalidUnitFile {
        file: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid unit file {file:?}: \"change-version\" not set")]
    MissingChangeVersion { file: String },
    #[error("relation directory {name:?} is not a valid relation id")]
    InvalidRelationId { name: String },
    #[error("{first:?} and {second:?} both have pending changed hooks")]
    DuplicateChangedPending { first: String, second: String },
}

/// Errors produced while recording a hook's effect on disk.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot encode unit record: {0}")]
    Encode(#[source] serde_yaml::Error),
    #[error("cannot replace {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    InvalidUnitName(#[from] uniter_types::DomainError),
}

/// Errors produced by state directory operations.
///
/// Every variant names the relation (or root) and operation involved so the
/// caller can decide whether to abandon the relation or retry.
#[derive(Debug, thiserror::Error)]
pub enum StateDirError {
    #[error("cannot load relation state from {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: LoadError,
    },
    #[error("cannot load relations state from {}: {source}", root.display())]
    LoadAll {
        root: PathBuf,
        #[source]
        source: Box<StateDirError>,
    },
    #[error("cannot create relation {relation_id} state directory {}: {source}", path.display())]
    Ensure {
        relation_id: RelationId,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write \"{kind}\" hook info for {unit:?} on relation {relation_id} state directory: {source}")]
    Write {
        relation_id: RelationId,
        kind: HookKind,
        unit: String,
        #[source]
        source: WriteError,
    },
}
