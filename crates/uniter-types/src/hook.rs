use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a relation. Its decimal form names the relation's state directory.
pub type RelationId = u32;

/// The lifecycle transitions a relation can deliver to the workload.
///
/// Per remote unit the order is always Joined → Changed → (Changed)* → Departed.
/// `RelationBroken` ends the relation itself and is only legal once every
/// unit has departed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookKind {
    /// A remote unit entered the relation.
    RelationJoined,
    /// A remote unit's relation settings changed (or are seen for the first time).
    RelationChanged,
    /// A remote unit left the relation.
    RelationDeparted,
    /// The relation was torn down (terminal).
    RelationBroken,
}

impl HookKind {
    /// Returns the hook name as a static string for error messages and logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RelationJoined => "relation-joined",
            Self::RelationChanged => "relation-changed",
            Self::RelationDeparted => "relation-departed",
            Self::RelationBroken => "relation-broken",
        }
    }

    /// Whether this hook targets a single remote unit rather than the whole relation.
    pub fn is_unit_hook(&self) -> bool {
        !matches!(self, Self::RelationBroken)
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Describes a single relation hook that should be (or has been) run.
///
/// Produced by the dispatch loop; this crate never invents one. `remote_unit`
/// is empty for `RelationBroken`, and `change_version` is only meaningful for
/// joined and changed hooks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookInfo {
    pub kind: HookKind,
    pub relation_id: RelationId,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote_unit: String,
    #[serde(default)]
    pub change_version: i64,
}

impl HookInfo {
    pub fn joined(relation_id: RelationId, unit: impl Into<String>, change_version: i64) -> Self {
        Self {
            kind: HookKind::RelationJoined,
            relation_id,
            remote_unit: unit.into(),
            change_version,
        }
    }

    pub fn changed(relation_id: RelationId, unit: impl Into<String>, change_version: i64) -> Self {
        Self {
            kind: HookKind::RelationChanged,
            relation_id,
            remote_unit: unit.into(),
            change_version,
        }
    }

    pub fn departed(relation_id: RelationId, unit: impl Into<String>) -> Self {
        Self {
            kind: HookKind::RelationDeparted,
            relation_id,
            remote_unit: unit.into(),
            change_version: 0,
        }
    }

    pub fn broken(relation_id: RelationId) -> Self {
        Self {
            kind: HookKind::RelationBroken,
            relation_id,
            remote_unit: String::new(),
            change_version: 0,
        }
    }
}
