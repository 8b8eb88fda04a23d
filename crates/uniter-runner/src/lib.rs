mod config;
mod error;
mod executor;
mod runner;

pub use config::RunnerConfig;
pub use error::RunnerError;
pub use executor::HookExecutor;
pub use runner::RelationRunner;
