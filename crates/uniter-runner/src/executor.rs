use uniter_types::{HookError, HookInfo};

/// Runs a relation hook against the workload.
///
/// Implementations may block (spawning the hook script, waiting on it);
/// callers wrap them in whatever timeout they need.
pub trait HookExecutor {
    fn run(&mut self, hook: &HookInfo) -> Result<(), HookError>;
}

impl<F> HookExecutor for F
where
    F: FnMut(&HookInfo) -> Result<(), HookError>,
{
    fn run(&mut self, hook: &HookInfo) -> Result<(), HookError> {
        self(hook)
    }
}
