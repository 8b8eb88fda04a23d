use crate::error::DomainError;

/// Maps a unit name such as `wordpress/0` to the file name its record is
/// stored under (`wordpress-0`).
///
/// Only the first `/` is replaced. Names that [`unit_from_file_name`] would not
/// map back to the same unit are rejected, since their records would be
/// invisible on reload.
pub fn unit_file_name(unit: &str) -> Result<String, DomainError> {
    let file_name = unit.replacen('/', "-", 1);
    match unit_from_file_name(&file_name) {
        Some(reloaded) if reloaded == unit => Ok(file_name),
        _ => Err(DomainError::InvalidUnitName {
            name: unit.to_string(),
        }),
    }
}

/// Reconstructs a unit name from a record file name, or `None` if the entry
/// is not a unit record.
///
/// The name is split at the last `-`; the prefix must be non-empty and the
/// suffix must be a non-negative decimal unit number.
pub fn unit_from_file_name(name: &str) -> Option<String> {
    let (service, number) = name.rsplit_once('-')?;
    if service.is_empty() || number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{service}/{number}"))
}
