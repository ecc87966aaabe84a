//! Specification selection normalization
//!
//! Clients send an item's selection as a list of `{name, option}` pairs; it is
//! stored as a map keyed by specification name and turned back into pairs on
//! read.

use shared::error::{AppError, ErrorCode};
use shared::models::{SelectedOption, SelectedSpecification};
use std::collections::BTreeMap;

/// Stored form of one item's selection
pub type SelectionMap = BTreeMap<String, SelectedOption>;

/// List of pairs → map. A specification named twice is rejected.
pub fn normalize(selection: Option<&[SelectedSpecification]>) -> Result<SelectionMap, AppError> {
    let mut map = SelectionMap::new();
    for spec in selection.unwrap_or_default() {
        if map.insert(spec.name.clone(), spec.option.clone()).is_some() {
            return Err(AppError::with_message(
                ErrorCode::DuplicateSpecification,
                format!("Specification '{}' is selected more than once", spec.name),
            )
            .with_detail("specification", spec.name.clone()));
        }
    }
    Ok(map)
}

/// Map → list of pairs
pub fn denormalize(map: SelectionMap) -> Vec<SelectedSpecification> {
    map.into_iter()
        .map(|(name, option)| SelectedSpecification { name, option })
        .collect()
}
