use std::fs;
use std::path::PathBuf;

use uniter_relation::read_all_state_dirs;

use crate::error::RunnerError;
use crate::executor::HookExecutor;
use crate::runner::RelationRunner;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    state_dir: PathBuf,
    ensure_on_start: bool,
}

impl RunnerConfig {
    /// `state_dir` is the root holding one subdirectory per relation.
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            ensure_on_start: false,
        }
    }

    /// Create the root directory before loading, if it is missing.
    pub fn ensure_on_start(mut self, ensure: bool) -> Self {
        self.ensure_on_start = ensure;
        self
    }

    /// Loads every persisted relation and returns a runner driving `executor`.
    pub fn build<E: HookExecutor>(&self, executor: E) -> Result<RelationRunner<E>, RunnerError> {
        if self.ensure_on_start {
            fs::create_dir_all(&self.state_dir).map_err(|source| RunnerError::Setup {
                path: self.state_dir.clone(),
                source,
            })?;
        }
        let dirs = read_all_state_dirs(&self.state_dir)?;
        Ok(RelationRunner::new(self.state_dir.clone(), dirs, executor))
    }
}
