//! Persistent local storage of a unit's relation state.
//!
//! A [`RelationState`] validates proposed hooks before they run; a
//! [`StateDir`] records the effect of each hook after it ran successfully,
//! one small record file per remote unit, so that a restarted agent resumes
//! exactly where it left off.

mod disk;
pub mod error;
pub mod state;
pub mod state_dir;

pub use error::{InappropriateHook, LoadError, RelationViolation, StateDirError, WriteError};
pub use state::{Membership, RelationState};
pub use state_dir::{StateDir, read_all_state_dirs};
