#![forbid(unsafe_code)]

//! Checkpoint picker policy: strategies that decide whether a value
//! transition is worth recording.
//!
//! A picker looks at one observed transition — previous snapshot, the
//! previous transition's change set, new snapshot, current change set — and
//! may nominate one of the two snapshots for saving, immediately or
//! deferred to the throttle window, optionally marking the other snapshot
//! as *equivalent* to it (so a cosmetic edit never becomes a branch point).
//!
//! [`CheckpointPolicy`] runs an ordered list of pickers and combines their
//! verdicts:
//!
//! - Requests are bucketed by which input snapshot they nominate. A
//!   nominated value equal to neither input is a contract violation.
//! - Within a bucket, any `now` request makes the save immediate; ties go
//!   to the first picker (all requests in a bucket nominate the same value,
//!   so this only affects logging).
//! - When both buckets are populated, the previous-snapshot save is emitted
//!   before the new-snapshot save.
//! - `equivalent` markings are collected independent of the save decision.

mod field_change;
mod word_editing;

pub use field_change::EditedFieldChangedPicker;
pub use word_editing::WordEditingPicker;

use tracing::debug;

use crate::error::RewindError;
use crate::values::{FormValues, ValuesDiff};

/// A picker's verdict for one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    /// The snapshot to save — one of the two the picker was given.
    pub value: FormValues,
    /// Save immediately instead of deferring to the throttle window.
    pub now: bool,
    /// Snapshot to register as matching `value` for all future history
    /// comparisons.
    pub equivalent: Option<FormValues>,
}

impl SaveRequest {
    /// Request a deferred (throttled) save.
    #[must_use]
    pub fn deferred(value: FormValues) -> Self {
        Self {
            value,
            now: false,
            equivalent: None,
        }
    }

    /// Request an immediate save.
    #[must_use]
    pub fn immediate(value: FormValues) -> Self {
        Self {
            value,
            now: true,
            equivalent: None,
        }
    }

    /// Mark another snapshot as equivalent to the nominated one.
    #[must_use]
    pub fn with_equivalent(mut self, equivalent: FormValues) -> Self {
        self.equivalent = Some(equivalent);
        self
    }
}

/// Strategy deciding whether a transition deserves a checkpoint.
pub trait CheckpointPicker {
    /// Picker name for logs and error messages.
    fn name(&self) -> &'static str;

    /// Inspect one transition and optionally nominate a snapshot to save.
    fn pick(
        &self,
        previous: &FormValues,
        previous_diff: &ValuesDiff,
        new: &FormValues,
        new_diff: &ValuesDiff,
    ) -> Option<SaveRequest>;
}

/// One save the policy decided on.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveAction {
    /// The snapshot to save.
    pub value: FormValues,
    /// True for an immediate save, false for a throttled one.
    pub immediate: bool,
}

/// Combined verdict of all pickers for one transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyOutcome {
    /// Saves to perform, in order (previous-snapshot save first).
    pub actions: Vec<SaveAction>,
    /// `(target, equivalent)` pairs to register with the history.
    pub equivalences: Vec<(FormValues, FormValues)>,
}

/// Ordered list of pickers evaluated on every observed transition.
pub struct CheckpointPolicy {
    pickers: Vec<Box<dyn CheckpointPicker>>,
}

impl std::fmt::Debug for CheckpointPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointPolicy")
            .field(
                "pickers",
                &self.pickers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl CheckpointPolicy {
    /// Build a policy from an ordered picker list.
    #[must_use]
    pub fn new(pickers: Vec<Box<dyn CheckpointPicker>>) -> Self {
        Self { pickers }
    }

    /// Run every picker on a transition and combine the verdicts.
    ///
    /// # Errors
    ///
    /// Returns [`RewindError::PolicyViolation`] if a picker nominates a
    /// value that is neither input snapshot.
    pub fn evaluate(
        &self,
        previous: &FormValues,
        previous_diff: &ValuesDiff,
        new: &FormValues,
        new_diff: &ValuesDiff,
    ) -> Result<PolicyOutcome, RewindError> {
        // (immediate, name of the first picker that filled the bucket)
        let mut previous_bucket: Option<(bool, &'static str)> = None;
        let mut new_bucket: Option<(bool, &'static str)> = None;
        let mut outcome = PolicyOutcome::default();

        for picker in &self.pickers {
            let Some(request) = picker.pick(previous, previous_diff, new, new_diff) else {
                continue;
            };
            debug!(
                picker = picker.name(),
                now = request.now,
                has_equivalent = request.equivalent.is_some(),
                "picker requested a save"
            );
            let bucket = if request.value == *previous {
                &mut previous_bucket
            } else if request.value == *new {
                &mut new_bucket
            } else {
                return Err(RewindError::PolicyViolation {
                    picker: picker.name().to_string(),
                });
            };
            match bucket {
                Some((immediate, _)) => *immediate = *immediate || request.now,
                None => *bucket = Some((request.now, picker.name())),
            }
            if let Some(equivalent) = request.equivalent {
                outcome.equivalences.push((request.value, equivalent));
            }
        }

        // Emit the canonical input snapshots, chronologically: the state
        // before the transition first, then the state after it.
        if let Some((immediate, picker)) = previous_bucket {
            debug!(picker, immediate, "saving the previous snapshot");
            outcome.actions.push(SaveAction {
                value: previous.clone(),
                immediate,
            });
        }
        if let Some((immediate, picker)) = new_bucket {
            debug!(picker, immediate, "saving the new snapshot");
            outcome.actions.push(SaveAction {
                value: new.clone(),
                immediate,
            });
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::values_diff;
    use serde_json::json;

    fn values(v: serde_json::Value) -> FormValues {
        FormValues::from_value(v).expect("test snapshot must be an object")
    }

    /// Picker that always returns a fixed request.
    struct Fixed {
        name: &'static str,
        request: SaveRequest,
    }

    impl CheckpointPicker for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn pick(
            &self,
            _previous: &FormValues,
            _previous_diff: &ValuesDiff,
            _new: &FormValues,
            _new_diff: &ValuesDiff,
        ) -> Option<SaveRequest> {
            Some(self.request.clone())
        }
    }

    fn transition() -> (FormValues, ValuesDiff, FormValues, ValuesDiff) {
        let previous = values(json!({"text": "a"}));
        let new = values(json!({"text": "b"}));
        let diff = values_diff(&previous, &new).unwrap();
        (previous, ValuesDiff::new(), new, diff)
    }

    #[test]
    fn empty_policy_produces_no_actions() {
        let (previous, prev_diff, new, diff) = transition();
        let policy = CheckpointPolicy::new(Vec::new());
        let outcome = policy.evaluate(&previous, &prev_diff, &new, &diff).unwrap();
        assert!(outcome.actions.is_empty());
        assert!(outcome.equivalences.is_empty());
    }

    #[test]
    fn single_deferred_request_passes_through() {
        let (previous, prev_diff, new, diff) = transition();
        let policy = CheckpointPolicy::new(vec![Box::new(Fixed {
            name: "fixed",
            request: SaveRequest::deferred(new.clone()),
        })]);
        let outcome = policy.evaluate(&previous, &prev_diff, &new, &diff).unwrap();
        assert_eq!(
            outcome.actions,
            vec![SaveAction {
                value: new,
                immediate: false
            }]
        );
    }

    #[test]
    fn now_wins_within_a_bucket() {
        let (previous, prev_diff, new, diff) = transition();
        let policy = CheckpointPolicy::new(vec![
            Box::new(Fixed {
                name: "deferred",
                request: SaveRequest::deferred(previous.clone()),
            }),
            Box::new(Fixed {
                name: "now",
                request: SaveRequest::immediate(previous.clone()),
            }),
        ]);
        let outcome = policy.evaluate(&previous, &prev_diff, &new, &diff).unwrap();
        assert_eq!(outcome.actions.len(), 1);
        assert!(outcome.actions[0].immediate);
        assert_eq!(outcome.actions[0].value, previous);
    }

    #[test]
    fn both_buckets_emit_previous_then_new() {
        let (previous, prev_diff, new, diff) = transition();
        let policy = CheckpointPolicy::new(vec![
            Box::new(Fixed {
                name: "wants_new",
                request: SaveRequest::deferred(new.clone()),
            }),
            Box::new(Fixed {
                name: "wants_previous",
                request: SaveRequest::immediate(previous.clone()),
            }),
        ]);
        let outcome = policy.evaluate(&previous, &prev_diff, &new, &diff).unwrap();
        assert_eq!(outcome.actions.len(), 2);
        assert_eq!(outcome.actions[0].value, previous);
        assert!(outcome.actions[0].immediate);
        assert_eq!(outcome.actions[1].value, new);
        assert!(!outcome.actions[1].immediate);
    }

    #[test]
    fn foreign_value_is_a_policy_violation() {
        let (previous, prev_diff, new, diff) = transition();
        let policy = CheckpointPolicy::new(vec![Box::new(Fixed {
            name: "rogue",
            request: SaveRequest::deferred(values(json!({"text": "synthesized"}))),
        })]);
        let err = policy
            .evaluate(&previous, &prev_diff, &new, &diff)
            .unwrap_err();
        assert_eq!(
            err,
            RewindError::PolicyViolation {
                picker: "rogue".to_string()
            }
        );
    }

    #[test]
    fn equivalences_collected_independent_of_actions() {
        let (previous, prev_diff, new, diff) = transition();
        let policy = CheckpointPolicy::new(vec![Box::new(Fixed {
            name: "equiv",
            request: SaveRequest::deferred(previous.clone()).with_equivalent(new.clone()),
        })]);
        let outcome = policy.evaluate(&previous, &prev_diff, &new, &diff).unwrap();
        assert_eq!(outcome.equivalences, vec![(previous.clone(), new)]);
        assert_eq!(outcome.actions.len(), 1);
        assert_eq!(outcome.actions[0].value, previous);
    }
}
