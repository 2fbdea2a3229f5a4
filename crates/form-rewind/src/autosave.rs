#![forbid(unsafe_code)]

//! Autosave orchestrator: turns the live edit stream into checkpoints.
//!
//! [`AutoSave`] watches each observed value transition, asks the checkpoint
//! picker policy whether it is worth recording, and routes approved saves
//! either straight into the history (forced boundaries) or through a
//! [`Throttler`] window (continuous typing). Self-inflicted writes — values
//! the history itself wrote back during undo/redo/reset — are recognized by
//! their [`WriteOrigin`] and never re-recorded.
//!
//! ```text
//!  store writes ──▶ observe ──▶ policy ──┬─ immediate ─▶ throttler.submit_now ─▶ append
//!                                        └─ deferred ──▶ throttler.submit ──┐
//!  tick ─────────▶ poll ──────────────────────────────────────────────────▶ append
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;
use web_time::Instant;

use crate::coalesce::Throttler;
use crate::error::RewindError;
use crate::history::CheckpointHistory;
use crate::picker::{
    CheckpointPicker, CheckpointPolicy, EditedFieldChangedPicker, WordEditingPicker,
};
use crate::store::WriteOrigin;
use crate::values::{values_diff, FormValues, ValuesDiff};

/// Autosave behavior knobs.
///
/// Serde-roundtrippable so hosts can keep it as configuration data; missing
/// fields fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSaveConfig {
    /// Observe edits at all. Disabling keeps bookkeeping current but
    /// records nothing, so re-enabling behaves correctly.
    pub enabled: bool,
    /// Minimum spacing between checkpoints during continuous editing.
    pub throttle_delay: Duration,
    /// Force a checkpoint boundary whenever the set of edited fields
    /// changes.
    pub save_on_field_change: bool,
    /// Suppress checkpoints that would split a word being typed.
    pub prevent_word_cutting: bool,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            throttle_delay: Duration::from_millis(2000),
            save_on_field_change: true,
            prevent_word_cutting: true,
        }
    }
}

/// Observes value transitions and decides when checkpoints are recorded.
#[derive(Debug)]
pub struct AutoSave {
    config: AutoSaveConfig,
    policy: CheckpointPolicy,
    throttler: Throttler<FormValues>,
    /// The value seen by the previous observation.
    previous_values: FormValues,
    /// Change set of the previous transition.
    previous_diff: ValuesDiff,
}

impl AutoSave {
    /// Build the orchestrator for a session starting at `initial`.
    #[must_use]
    pub fn new(initial: FormValues, config: AutoSaveConfig) -> Self {
        let mut pickers: Vec<Box<dyn CheckpointPicker>> = vec![Box::new(WordEditingPicker::new(
            config.prevent_word_cutting,
        ))];
        if config.save_on_field_change {
            pickers.push(Box::new(EditedFieldChangedPicker::new()));
        }
        Self {
            policy: CheckpointPolicy::new(pickers),
            throttler: Throttler::new(initial.clone(), config.throttle_delay),
            previous_values: initial,
            previous_diff: ValuesDiff::new(),
            config,
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &AutoSaveConfig {
        &self.config
    }

    /// Turn observation on or off without touching the history. Disabling
    /// cancels the pending throttle window.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.throttler.cancel();
        }
        self.config.enabled = enabled;
    }

    /// When the pending throttle window elapses, if one is open.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.throttler.next_deadline()
    }

    /// Drive the throttle window; a fired output becomes a checkpoint.
    pub fn poll(&mut self, history: &mut CheckpointHistory, now: Instant) {
        if let Some(values) = self.throttler.poll(now) {
            history.append(&values);
        }
    }

    /// Process one observed value transition.
    ///
    /// # Errors
    ///
    /// Propagates [`RewindError::ReservedPathChar`] from diffing and
    /// [`RewindError::PolicyViolation`] from a broken picker.
    pub fn observe(
        &mut self,
        values: &FormValues,
        origin: WriteOrigin,
        history: &mut CheckpointHistory,
        now: Instant,
    ) -> Result<(), RewindError> {
        if origin == WriteOrigin::History {
            trace!("observation skipped: value was written by the history");
            return Ok(());
        }
        if *values == self.previous_values {
            return Ok(()); // Nothing actually changed.
        }
        let diff = values_diff(&self.previous_values, values)?;

        if self.config.enabled {
            let outcome =
                self.policy
                    .evaluate(&self.previous_values, &self.previous_diff, values, &diff)?;
            for (target, equivalent) in outcome.equivalences {
                history.add_equivalence(target, equivalent);
            }
            for action in outcome.actions {
                let emitted = if action.immediate {
                    self.throttler.submit_now(action.value, now)
                } else {
                    self.throttler.submit(action.value, now)
                };
                if let Some(values) = emitted {
                    history.append(&values);
                }
            }
        }

        self.previous_values = values.clone();
        self.previous_diff = diff;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(v: serde_json::Value) -> FormValues {
        FormValues::from_value(v).expect("test snapshot must be an object")
    }

    fn setup(initial: serde_json::Value) -> (AutoSave, CheckpointHistory, Instant) {
        let initial = values(initial);
        let autosave = AutoSave::new(initial.clone(), AutoSaveConfig::default());
        let history = CheckpointHistory::new(initial);
        (autosave, history, Instant::now())
    }

    const STEP: Duration = Duration::from_millis(100);

    #[test]
    fn config_defaults() {
        let config = AutoSaveConfig::default();
        assert!(config.enabled);
        assert_eq!(config.throttle_delay, Duration::from_millis(2000));
        assert!(config.save_on_field_change);
        assert!(config.prevent_word_cutting);
    }

    #[test]
    fn config_serde_round_trip() {
        let config = AutoSaveConfig {
            enabled: false,
            throttle_delay: Duration::from_millis(500),
            save_on_field_change: false,
            prevent_word_cutting: true,
        };
        let text = serde_json::to_string(&config).unwrap();
        let back: AutoSaveConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn config_missing_fields_fall_back_to_defaults() {
        let config: AutoSaveConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AutoSaveConfig::default());
    }

    #[test]
    fn mid_word_typing_records_nothing() {
        let (mut autosave, mut history, t0) = setup(json!({"text": "hel"}));
        // Seed the edited-field bookkeeping so the switch picker is quiet.
        autosave.previous_diff = values_diff(
            &values(json!({"text": "he"})),
            &values(json!({"text": "hel"})),
        )
        .unwrap();

        autosave
            .observe(
                &values(json!({"text": "hello"})),
                WriteOrigin::User,
                &mut history,
                t0,
            )
            .unwrap();
        assert_eq!(history.checkpoint_count(), 1);
    }

    #[test]
    fn word_boundary_commits_previous_after_throttle() {
        let (mut autosave, mut history, t0) = setup(json!({"text": ""}));

        // First keystrokes: the word picker nominates the (empty) initial
        // state, which matches the seed and records nothing.
        autosave
            .observe(
                &values(json!({"text": "hello"})),
                WriteOrigin::User,
                &mut history,
                t0,
            )
            .unwrap();
        assert_eq!(history.checkpoint_count(), 1);

        // Finishing the word defers a save of "hello" and marks the
        // trailing-space variant equivalent to it.
        autosave
            .observe(
                &values(json!({"text": "hello "})),
                WriteOrigin::User,
                &mut history,
                t0 + STEP,
            )
            .unwrap();
        assert_eq!(history.checkpoint_count(), 1);

        // The throttle window elapses and the deferred save lands.
        autosave.poll(&mut history, t0 + Duration::from_millis(2100));
        assert_eq!(history.checkpoint_count(), 2);
        assert_eq!(history.current(), &values(json!({"text": "hello"})));
        // The live trailing-space value is not a divergence.
        assert!(!history.diverged(&values(json!({"text": "hello "}))));
    }

    #[test]
    fn field_switch_commits_immediately() {
        let (mut autosave, mut history, t0) = setup(json!({"title": "", "content": ""}));

        autosave
            .observe(
                &values(json!({"title": "T", "content": ""})),
                WriteOrigin::User,
                &mut history,
                t0,
            )
            .unwrap();
        assert_eq!(history.checkpoint_count(), 1);

        // Moving to another field checkpoints the fully-typed title at once.
        autosave
            .observe(
                &values(json!({"title": "T", "content": "c"})),
                WriteOrigin::User,
                &mut history,
                t0 + STEP,
            )
            .unwrap();
        assert_eq!(history.checkpoint_count(), 2);
        assert_eq!(
            history.current(),
            &values(json!({"title": "T", "content": ""}))
        );
    }

    #[test]
    fn self_inflicted_writes_are_ignored() {
        let (mut autosave, mut history, t0) = setup(json!({"text": ""}));
        autosave
            .observe(
                &values(json!({"text": "undone"})),
                WriteOrigin::History,
                &mut history,
                t0,
            )
            .unwrap();
        assert_eq!(history.checkpoint_count(), 1);
        // Bookkeeping untouched: the next user edit diffs against the
        // original previous value.
        assert_eq!(autosave.previous_values, values(json!({"text": ""})));
    }

    #[test]
    fn disabled_updates_bookkeeping_but_saves_nothing() {
        let initial = values(json!({"title": "", "content": ""}));
        let mut autosave = AutoSave::new(
            initial.clone(),
            AutoSaveConfig {
                enabled: false,
                ..AutoSaveConfig::default()
            },
        );
        let mut history = CheckpointHistory::new(initial);
        let t0 = Instant::now();

        autosave
            .observe(
                &values(json!({"title": "T", "content": ""})),
                WriteOrigin::User,
                &mut history,
                t0,
            )
            .unwrap();
        autosave.poll(&mut history, t0 + Duration::from_millis(5000));
        assert_eq!(history.checkpoint_count(), 1);
        assert_eq!(autosave.previous_values, values(json!({"title": "T", "content": ""})));
    }

    #[test]
    fn disabling_cancels_pending_window() {
        let (mut autosave, mut history, t0) = setup(json!({"text": ""}));
        autosave
            .observe(
                &values(json!({"text": "one two"})),
                WriteOrigin::User,
                &mut history,
                t0,
            )
            .unwrap();
        autosave
            .observe(
                &values(json!({"text": "one two three"})),
                WriteOrigin::User,
                &mut history,
                t0 + STEP,
            )
            .unwrap();

        autosave.set_enabled(false);
        autosave.poll(&mut history, t0 + Duration::from_millis(5000));
        assert_eq!(history.checkpoint_count(), 1);
        assert!(autosave.next_deadline().is_none());
    }

    #[test]
    fn unchanged_observation_is_a_no_op() {
        let (mut autosave, mut history, t0) = setup(json!({"text": "x"}));
        autosave
            .observe(
                &values(json!({"text": "x", "gone": null})),
                WriteOrigin::User,
                &mut history,
                t0,
            )
            .unwrap();
        assert_eq!(history.checkpoint_count(), 1);
        assert!(autosave.next_deadline().is_none());
    }

    #[test]
    fn dotted_field_name_surfaces_as_error() {
        let (mut autosave, mut history, t0) = setup(json!({"text": ""}));
        let err = autosave
            .observe(
                &values(json!({"text": "", "a.b": 1})),
                WriteOrigin::User,
                &mut history,
                t0,
            )
            .unwrap_err();
        assert!(matches!(err, RewindError::ReservedPathChar { .. }));
    }
}
