#![forbid(unsafe_code)]

//! Picker that avoids checkpointing in the middle of a word.

use serde_json::Value;

use super::{CheckpointPicker, SaveRequest};
use crate::values::{FormValues, ValuesDiff};

/// Suppresses checkpoints that would split a word in a text field.
///
/// Active only when a transition touches exactly one field and both the old
/// and new values are text. The verdicts:
///
/// - word cutting not prevented → save the new snapshot (deferred);
/// - only trailing whitespace/hyphens were appended → save the *previous*
///   snapshot and mark the new one equivalent to it (the user just finished
///   a word; nothing new to branch on, but not "no change" either);
/// - word count unchanged → decline (mid-word edit, not yet interesting);
/// - word count changed → save the *previous* snapshot (checkpoint the
///   state before the word appeared or disappeared).
#[derive(Debug, Clone)]
pub struct WordEditingPicker {
    prevent_word_cutting: bool,
}

impl WordEditingPicker {
    /// Create the picker. With `prevent_word_cutting` disabled it approves
    /// every single-text-field edit unconditionally.
    #[must_use]
    pub fn new(prevent_word_cutting: bool) -> Self {
        Self {
            prevent_word_cutting,
        }
    }
}

impl CheckpointPicker for WordEditingPicker {
    fn name(&self) -> &'static str {
        "word_editing"
    }

    fn pick(
        &self,
        previous: &FormValues,
        _previous_diff: &ValuesDiff,
        new: &FormValues,
        new_diff: &ValuesDiff,
    ) -> Option<SaveRequest> {
        if new_diff.len() != 1 {
            return None; // Does not look like word editing.
        }
        let (old_value, new_value) = new_diff.values().next()?;
        let (Value::String(old_text), Value::String(new_text)) = (old_value, new_value) else {
            return None; // Does not look like word editing.
        };

        if !self.prevent_word_cutting {
            return Some(SaveRequest::deferred(new.clone()));
        }

        if let Some(appended) = new_text.strip_prefix(old_text.as_str()) {
            if !appended.is_empty() && appended.chars().all(|c| c.is_whitespace() || c == '-') {
                // The user just finished a word.
                return Some(SaveRequest::deferred(previous.clone()).with_equivalent(new.clone()));
            }
        }

        if word_count(old_text) == word_count(new_text) {
            return None; // No word added or removed, this state is not interesting.
        }

        Some(SaveRequest::deferred(previous.clone()))
    }
}

/// Number of whitespace-separated word runs. An empty or all-whitespace
/// string has zero words.
fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
