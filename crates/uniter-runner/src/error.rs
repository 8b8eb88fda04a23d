use std::path::PathBuf;

use thiserror::Error;
use uniter_relation::{InappropriateHook, StateDirError};
use uniter_types::{HookError, HookKind, RelationId};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("hook rejected: {0}")]
    Rejected(#[from] InappropriateHook),
    #[error("\"{kind}\" hook for {unit:?} on relation {relation_id} failed: {source}")]
    Hook {
        relation_id: RelationId,
        kind: HookKind,
        unit: String,
        #[source]
        source: HookError,
    },
    #[error("cannot create relations state root {}: {source}", path.display())]
    Setup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    State(#[from] StateDirError),
}
