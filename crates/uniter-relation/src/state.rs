use std::collections::BTreeMap;

use uniter_types::{HookInfo, HookKind, RelationId};

use crate::error::{InappropriateHook, RelationViolation};

/// Membership of a relation as seen by this unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Membership {
    Active {
        /// Unit name → last change version delivered for that unit.
        members: BTreeMap<String, i64>,
        /// Unit whose first `relation-changed` must be the next hook run.
        changed_pending: Option<String>,
    },
    /// `relation-broken` has been recorded. Terminal.
    Broken,
}

/// Authoritative view of a relation, against which hooks are validated.
///
/// Only [`RelationState::apply`] mutates it, and only once a hook has run and
/// its effect has been persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationState {
    relation_id: RelationId,
    membership: Membership,
}

impl RelationState {
    /// An active relation with no members and nothing pending.
    pub fn new(relation_id: RelationId) -> Self {
        Self {
            relation_id,
            membership: Membership::Active {
                members: BTreeMap::new(),
                changed_pending: None,
            },
        }
    }

    pub(crate) fn from_parts(
        relation_id: RelationId,
        members: BTreeMap<String, i64>,
        changed_pending: Option<String>,
    ) -> Self {
        Self {
            relation_id,
            membership: Membership::Active {
                members,
                changed_pending,
            },
        }
    }

    pub fn relation_id(&self) -> RelationId {
        self.relation_id
    }

    pub fn membership(&self) -> &Membership {
        &self.membership
    }

    /// Current members, or `None` once the relation is broken.
    pub fn members(&self) -> Option<&BTreeMap<String, i64>> {
        match &self.membership {
            Membership::Active { members, .. } => Some(members),
            Membership::Broken => None,
        }
    }

    pub fn changed_pending(&self) -> Option<&str> {
        match &self.membership {
            Membership::Active {
                changed_pending, ..
            } => changed_pending.as_deref(),
            Membership::Broken => None,
        }
    }

    pub fn is_broken(&self) -> bool {
        matches!(self.membership, Membership::Broken)
    }

    /// Returns an error if `hi` is not a valid next hook for this relation.
    ///
    /// Hooks must be validated against the current state before they run;
    /// this is what guarantees hook ordering. Checks run in a fixed order and
    /// the first failure wins: relation id, broken, relation-broken
    /// preconditions, pending changed hook, then membership.
    pub fn validate(&self, hi: &HookInfo) -> Result<(), InappropriateHook> {
        self.check(hi).map_err(|violation| InappropriateHook {
            kind: hi.kind,
            unit: hi.remote_unit.clone(),
            violation,
        })
    }

    fn check(&self, hi: &HookInfo) -> Result<(), RelationViolation> {
        if hi.relation_id != self.relation_id {
            return Err(RelationViolation::WrongRelation {
                expected: self.relation_id,
                actual: hi.relation_id,
            });
        }
        let Membership::Active {
            members,
            changed_pending,
        } = &self.membership
        else {
            return Err(RelationViolation::RelationAlreadyBroken);
        };
        if hi.kind == HookKind::RelationBroken {
            if members.is_empty() {
                return Ok(());
            }
            return Err(RelationViolation::UnitsStillPresent);
        }
        if let Some(pending) = changed_pending {
            if hi.remote_unit != *pending || hi.kind != HookKind::RelationChanged {
                return Err(RelationViolation::PendingChangeRequired {
                    pending: pending.clone(),
                });
            }
            return Ok(());
        }
        let joined = members.contains_key(&hi.remote_unit);
        match (joined, hi.kind) {
            (true, HookKind::RelationJoined) => Err(RelationViolation::AlreadyJoined),
            (false, kind) if kind != HookKind::RelationJoined => Err(RelationViolation::NotJoined),
            _ => Ok(()),
        }
    }

    /// Mirror the effect of a hook whose record has already been persisted.
    ///
    /// Does not validate. Applying the same hook twice leaves the state as
    /// applying it once would. A departing unit is removed from the members
    /// but `changed_pending` is left as it was.
    pub(crate) fn apply(&mut self, hi: &HookInfo) {
        let Membership::Active {
            members,
            changed_pending,
        } = &mut self.membership
        else {
            return;
        };
        match hi.kind {
            HookKind::RelationBroken => self.membership = Membership::Broken,
            HookKind::RelationDeparted => {
                members.remove(&hi.remote_unit);
            }
            HookKind::RelationJoined => {
                members.insert(hi.remote_unit.clone(), hi.change_version);
                *changed_pending = Some(hi.remote_unit.clone());
            }
            HookKind::RelationChanged => {
                members.insert(hi.remote_unit.clone(), hi.change_version);
                *changed_pending = None;
            }
        }
    }
}
