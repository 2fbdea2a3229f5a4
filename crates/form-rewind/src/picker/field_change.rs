#![forbid(unsafe_code)]

//! Picker that forces a checkpoint boundary when the edited fields change.

use super::{CheckpointPicker, SaveRequest};
use crate::values::{FormValues, ValuesDiff};

/// Forces an immediate checkpoint when the user moves to different fields.
///
/// Compares the previous transition's modified-path set to the current one
/// (order-insensitive). When they differ, the fully-typed value of the
/// field(s) the user just left must not be lost to throttling, so the
/// *previous* snapshot is saved with `now`.
///
/// Any change to the set — superset, subset, or disjoint — counts as a
/// switch.
#[derive(Debug, Clone, Default)]
pub struct EditedFieldChangedPicker;

impl EditedFieldChangedPicker {
    /// Create the picker.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CheckpointPicker for EditedFieldChangedPicker {
    fn name(&self) -> &'static str {
        "edited_field_changed"
    }

    fn pick(
        &self,
        previous: &FormValues,
        previous_diff: &ValuesDiff,
        _new: &FormValues,
        new_diff: &ValuesDiff,
    ) -> Option<SaveRequest> {
        if same_paths(previous_diff, new_diff) {
            return None;
        }
        Some(SaveRequest::immediate(previous.clone()))
    }
}

/// Order-insensitive set equality of the modified paths. `ValuesDiff` keys
/// are sorted, so positional comparison is set comparison.
fn same_paths(a: &ValuesDiff, b: &ValuesDiff) -> bool {
    a.len() == b.len() && a.keys().eq(b.keys())
}
