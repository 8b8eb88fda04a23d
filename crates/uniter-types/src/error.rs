#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("invalid unit name {name:?}")]
    InvalidUnitName { name: String },
}
