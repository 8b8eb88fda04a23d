pub mod error;
pub mod hook;
pub mod hook_error;
pub mod unit;

pub use error::DomainError;
pub use hook::{HookInfo, HookKind, RelationId};
pub use hook_error::{HookError, HookErrorKind};
pub use unit::{unit_file_name, unit_from_file_name};
