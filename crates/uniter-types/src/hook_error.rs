use std::fmt;

use serde::{Deserialize, Serialize};

/// How a hook script failed to complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HookErrorKind {
    /// The charm ships no script for this hook. Nothing ran, and the hook
    /// counts as delivered.
    Missing,
    /// The script ran and exited with a non-zero status.
    Exited { code: i32 },
    /// The script was stopped by a signal before it exited.
    Killed { signal: i32 },
}

/// Failure reported by a hook executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookError {
    pub kind: HookErrorKind,
    /// Tail of the script's standard error, if captured.
    pub stderr: Option<String>,
}

impl HookError {
    pub fn missing() -> Self {
        Self {
            kind: HookErrorKind::Missing,
            stderr: None,
        }
    }

    pub fn exited(code: i32) -> Self {
        Self {
            kind: HookErrorKind::Exited { code },
            stderr: None,
        }
    }

    pub fn killed(signal: i32) -> Self {
        Self {
            kind: HookErrorKind::Killed { signal },
            stderr: None,
        }
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = Some(stderr.into());
        self
    }

    /// Whether the hook never ran because no script exists for it.
    pub fn is_missing(&self) -> bool {
        matches!(self.kind, HookErrorKind::Missing)
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            HookErrorKind::Missing => write!(f, "hook script not found")?,
            HookErrorKind::Exited { code } => write!(f, "exit status {code}")?,
            HookErrorKind::Killed { signal } => write!(f, "killed by signal {signal}")?,
        }
        if let Some(stderr) = &self.stderr {
            write!(f, ": {}", stderr.trim_end())?;
        }
        Ok(())
    }
}

impl std::error::Error for HookError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_exit_and_stderr() {
        insta::assert_snapshot!(HookError::exited(1).to_string(), @"exit status 1");
        insta::assert_snapshot!(
            HookError::killed(9).with_stderr("out of memory\n").to_string(),
            @"killed by signal 9: out of memory"
        );
    }

    #[test]
    fn only_missing_scripts_count_as_missing() {
        assert!(HookError::missing().is_missing());
        assert!(!HookError::exited(0).is_missing());
        assert!(!HookError::killed(15).is_missing());
    }
}
