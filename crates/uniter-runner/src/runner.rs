use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::PathBuf;

use uniter_relation::{RelationState, StateDir};
use uniter_types::{HookInfo, RelationId};

use crate::error::RunnerError;
use crate::executor::HookExecutor;

/// Delivers relation hooks in order: validate, run, then record.
///
/// A hook is recorded only after the executor reports success, so the
/// persisted state always describes hooks that definitely ran. If the agent
/// dies between running and recording, delivering the same hook again is
/// safe. Relations are driven one hook at a time.
#[derive(Debug)]
pub struct RelationRunner<E> {
    root: PathBuf,
    dirs: BTreeMap<RelationId, StateDir>,
    executor: E,
}

impl<E: HookExecutor> RelationRunner<E> {
    pub(crate) fn new(root: PathBuf, dirs: BTreeMap<RelationId, StateDir>, executor: E) -> Self {
        Self {
            root,
            dirs,
            executor,
        }
    }

    /// Current state of a known relation.
    pub fn state(&self, relation_id: RelationId) -> Option<&RelationState> {
        self.dirs.get(&relation_id).map(StateDir::state)
    }

    /// Relations loaded at start-up or seen since, including broken ones.
    pub fn relation_ids(&self) -> impl Iterator<Item = RelationId> + '_ {
        self.dirs.keys().copied()
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    /// Validates `hi`, runs it and records its effect.
    ///
    /// A rejected hook is never run. A hook whose script is missing is
    /// recorded as if it ran; any other failure is not recorded, so the
    /// caller may retry the hook unchanged.
    pub fn deliver(&mut self, hi: &HookInfo) -> Result<(), RunnerError> {
        let dir = match self.dirs.entry(hi.relation_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(StateDir::read(&self.root, hi.relation_id)?),
        };

        if let Err(err) = dir.state().validate(hi) {
            tracing::warn!(relation_id = hi.relation_id, error = %err, "rejected relation hook");
            return Err(err.into());
        }
        if hi.kind.is_unit_hook() {
            dir.ensure()?;
        }

        match self.executor.run(hi) {
            Ok(()) => {}
            Err(err) if err.is_missing() => {
                tracing::debug!(relation_id = hi.relation_id, kind = %hi.kind, "skipped missing hook");
            }
            Err(source) => {
                return Err(RunnerError::Hook {
                    relation_id: hi.relation_id,
                    kind: hi.kind,
                    unit: hi.remote_unit.clone(),
                    source,
                });
            }
        }

        dir.write(hi)?;
        tracing::info!(
            relation_id = hi.relation_id,
            kind = %hi.kind,
            unit = %hi.remote_unit,
            "ran relation hook"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::fs;

    use uniter_relation::{Membership, RelationViolation};
    use uniter_types::{HookError, HookErrorKind};

    use super::*;
    use crate::config::RunnerConfig;

    #[derive(Debug, Default)]
    struct Recorder {
        ran: Vec<HookInfo>,
        failures: VecDeque<HookError>,
    }

    impl HookExecutor for Recorder {
        fn run(&mut self, hook: &HookInfo) -> Result<(), HookError> {
            if let Some(err) = self.failures.pop_front() {
                return Err(err);
            }
            self.ran.push(hook.clone());
            Ok(())
        }
    }

    #[test_log::test]
    fn delivers_full_protocol_and_survives_restart() {
        let root = tempfile::tempdir().unwrap();
        let config = RunnerConfig::new(root.path());
        let mut runner = config.build(Recorder::default()).unwrap();
        assert_eq!(runner.relation_ids().count(), 0);

        let hooks = [
            HookInfo::joined(1, "wordpress/0", 1),
            HookInfo::changed(1, "wordpress/0", 1),
            HookInfo::joined(2, "mysql/0", 1),
            HookInfo::changed(1, "wordpress/0", 2),
        ];
        for hi in &hooks {
            runner.deliver(hi).unwrap();
        }
        similar_asserts::assert_eq!(runner.executor().ran, hooks.to_vec());

        let restarted = config.build(Recorder::default()).unwrap();
        assert_eq!(restarted.relation_ids().collect::<Vec<_>>(), vec![1, 2]);
        similar_asserts::assert_eq!(restarted.state(1), runner.state(1));
        assert_eq!(restarted.state(2).and_then(|s| s.changed_pending()), Some("mysql/0"));

        let mut runner = restarted;
        for hi in [
            HookInfo::changed(2, "mysql/0", 1),
            HookInfo::departed(2, "mysql/0"),
            HookInfo::broken(2),
        ] {
            runner.deliver(&hi).unwrap();
        }
        assert_eq!(runner.state(2).map(|s| s.membership()), Some(&Membership::Broken));
        assert!(!root.path().join("2").exists());
    }

    #[test_log::test]
    fn rejected_hook_is_not_run() {
        let root = tempfile::tempdir().unwrap();
        let mut runner = RunnerConfig::new(root.path())
            .build(Recorder::default())
            .unwrap();
        runner.deliver(&HookInfo::joined(4, "foo/0", 1)).unwrap();

        let err = runner.deliver(&HookInfo::joined(4, "bar/0", 2)).unwrap_err();
        match err {
            RunnerError::Rejected(rejected) => assert_eq!(
                rejected.violation,
                RelationViolation::PendingChangeRequired {
                    pending: "foo/0".to_string()
                }
            ),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(runner.executor().ran.len(), 1);
    }

    #[test_log::test]
    fn failed_hook_is_not_recorded_and_can_be_retried() {
        let root = tempfile::tempdir().unwrap();
        let mut runner = RunnerConfig::new(root.path())
            .build(Recorder::default())
            .unwrap();
        runner
            .executor_mut()
            .failures
            .push_back(HookError::exited(1).with_stderr("boom"));

        let hi = HookInfo::joined(6, "foo/0", 1);
        let err = runner.deliver(&hi).unwrap_err();
        assert!(matches!(
            err,
            RunnerError::Hook {
                relation_id: 6,
                source: HookError {
                    kind: HookErrorKind::Exited { code: 1 },
                    ..
                },
                ..
            }
        ));
        assert_eq!(runner.state(6), Some(&RelationState::new(6)));
        assert_eq!(fs::read_dir(root.path().join("6")).unwrap().count(), 0);

        runner.deliver(&hi).unwrap();
        assert_eq!(runner.state(6).and_then(|s| s.changed_pending()), Some("foo/0"));
    }

    #[test_log::test]
    fn missing_hook_script_is_recorded_as_run() {
        let root = tempfile::tempdir().unwrap();
        let mut runner = RunnerConfig::new(root.path())
            .build(Recorder::default())
            .unwrap();
        runner.executor_mut().failures.push_back(HookError::missing());

        runner.deliver(&HookInfo::joined(5, "foo/0", 1)).unwrap();
        assert!(runner.executor().ran.is_empty());
        assert_eq!(runner.state(5).and_then(|s| s.changed_pending()), Some("foo/0"));

        let reloaded = RunnerConfig::new(root.path())
            .build(Recorder::default())
            .unwrap();
        similar_asserts::assert_eq!(reloaded.state(5), runner.state(5));
    }

    #[test_log::test]
    fn broken_relation_stays_registered() {
        let root = tempfile::tempdir().unwrap();
        let mut runner = RunnerConfig::new(root.path().join("relations"))
            .ensure_on_start(true)
            .build(Recorder::default())
            .unwrap();
        assert!(root.path().join("relations").is_dir());

        runner.deliver(&HookInfo::broken(8)).unwrap();
        let err = runner.deliver(&HookInfo::joined(8, "foo/0", 1)).unwrap_err();
        assert!(matches!(
            err,
            RunnerError::Rejected(ref r) if r.violation == RelationViolation::RelationAlreadyBroken
        ));
        assert_eq!(runner.relation_ids().collect::<Vec<_>>(), vec![8]);
    }

    #[test_log::test]
    fn closures_are_executors() {
        let root = tempfile::tempdir().unwrap();
        let mut count = 0;
        {
            let mut runner = RunnerConfig::new(root.path())
                .build(|_: &HookInfo| -> Result<(), HookError> {
                    count += 1;
                    Ok(())
                })
                .unwrap();
            runner.deliver(&HookInfo::joined(1, "foo/0", 1)).unwrap();
            runner.deliver(&HookInfo::changed(1, "foo/0", 1)).unwrap();
        }
        assert_eq!(count, 2);
    }

    #[test_log::test]
    fn corrupt_state_blocks_start_up() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("3")).unwrap();
        fs::write(root.path().join("3").join("foo-0"), "changed-pending: true\n").unwrap();

        let err = RunnerConfig::new(root.path())
            .build(Recorder::default())
            .unwrap_err();
        assert!(matches!(err, RunnerError::State(_)));
    }
}
