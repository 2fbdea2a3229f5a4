#![forbid(unsafe_code)]

//! One form-editing session: store, history, and autosave wired together.
//!
//! [`UndoSession`] is the entry point a host integrates against. It owns
//! the [`CheckpointHistory`] and the [`AutoSave`] orchestrator and holds a
//! handle to the shared [`FormStore`] the host edits through. The host's
//! only obligations are:
//!
//! 1. write edits into the store (`store.set(..)`),
//! 2. call [`tick`](UndoSession::tick) after edits and at (or after)
//!    [`next_deadline`](UndoSession::next_deadline),
//! 3. call [`undo`](UndoSession::undo)/[`redo`](UndoSession::redo)/
//!    [`reset`](UndoSession::reset) from its controls, re-rendering from
//!    store notifications.
//!
//! Everything is single-threaded and event-driven; a session dropped
//! mid-burst takes its pending throttle window with it.

use tracing::debug;
use web_time::Instant;

use crate::autosave::{AutoSave, AutoSaveConfig};
use crate::error::RewindError;
use crate::history::CheckpointHistory;
use crate::store::{FormStore, WriteOrigin};
use crate::values::FormValues;

/// A live undo/autosave session over one [`FormStore`].
#[derive(Debug)]
pub struct UndoSession {
    store: FormStore,
    history: CheckpointHistory,
    autosave: AutoSave,
    /// Store version already folded into the orchestrator.
    seen_version: u64,
}

impl UndoSession {
    /// Start a session. The store's current values become the initial
    /// checkpoint.
    #[must_use]
    pub fn new(store: FormStore, config: AutoSaveConfig) -> Self {
        let initial = store.get();
        let seen_version = store.version();
        Self {
            history: CheckpointHistory::new(initial.clone()),
            autosave: AutoSave::new(initial, config),
            store,
            seen_version,
        }
    }

    // ====================================================================
    // Driving
    // ====================================================================

    /// Advance the session: fire a due throttle window, then fold in any
    /// store change since the last tick.
    ///
    /// The window is polled first so that a save already due commits ahead
    /// of newer edits — outputs change strictly in submission order.
    ///
    /// # Errors
    ///
    /// Propagates fatal diffing/policy errors; see [`RewindError`].
    pub fn tick(&mut self, now: Instant) -> Result<(), RewindError> {
        self.autosave.poll(&mut self.history, now);
        let version = self.store.version();
        if version != self.seen_version {
            self.seen_version = version;
            let origin = self.store.last_origin();
            let values = self.store.get();
            self.autosave
                .observe(&values, origin, &mut self.history, now)?;
        }
        Ok(())
    }

    /// When [`tick`](UndoSession::tick) next needs to run for a pending
    /// save, if one is waiting.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.autosave.next_deadline()
    }

    // ====================================================================
    // Checkpoints
    // ====================================================================

    /// Record a checkpoint right now. `None` saves the store's current
    /// values. Returns whether a checkpoint was recorded (an
    /// indistinguishable value is absorbed as a no-op).
    pub fn save_checkpoint(&mut self, values: Option<FormValues>) -> bool {
        let values = values.unwrap_or_else(|| self.store.get());
        self.history.append(&values)
    }

    /// Register `equivalent` as matching `target` for all future history
    /// comparisons.
    pub fn add_checkpoint_equivalent(&mut self, target: FormValues, equivalent: FormValues) {
        self.history.add_equivalence(target, equivalent);
    }

    // ====================================================================
    // Navigation
    // ====================================================================

    /// Step one state back, writing the reached checkpoint into the store.
    /// Returns whether navigation happened.
    pub fn undo(&mut self) -> bool {
        let live = self.store.get();
        let Some(checkpoint) = self.history.undo(&live) else {
            return false;
        };
        let checkpoint = checkpoint.clone();
        debug!("undo applied");
        self.store.set_from_history(checkpoint);
        true
    }

    /// Step one state forward, writing the reached checkpoint into the
    /// store. Returns whether navigation happened.
    pub fn redo(&mut self) -> bool {
        let live = self.store.get();
        let Some(checkpoint) = self.history.redo(&live) else {
            return false;
        };
        let checkpoint = checkpoint.clone();
        debug!("redo applied");
        self.store.set_from_history(checkpoint);
        true
    }

    /// Jump back to the initial values, preserving uncommitted edits for
    /// redo. Returns whether navigation happened.
    pub fn reset(&mut self) -> bool {
        let live = self.store.get();
        let Some(checkpoint) = self.history.reset(&live) else {
            return false;
        };
        let checkpoint = checkpoint.clone();
        debug!("reset applied");
        self.store.set_from_history(checkpoint);
        true
    }

    // ====================================================================
    // Introspection
    // ====================================================================

    /// Number of states `undo` can reach from here.
    #[must_use]
    pub fn undoable_count(&self) -> usize {
        self.store.with(|live| self.history.undoable_count(live))
    }

    /// Number of states `redo` can reach from here.
    #[must_use]
    pub fn redoable_count(&self) -> usize {
        self.store.with(|live| self.history.redoable_count(live))
    }

    /// True when the current store values were written by the history
    /// itself (the most recent write came from undo/redo/reset).
    #[must_use]
    pub fn did_create_current_values(&self) -> bool {
        self.store.last_origin() == WriteOrigin::History
    }

    /// Turn autosave observation on or off without destroying history.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.autosave.set_enabled(enabled);
    }

    /// The active autosave configuration.
    #[must_use]
    pub fn config(&self) -> &AutoSaveConfig {
        self.autosave.config()
    }

    /// Read-only view of the checkpoint history.
    #[must_use]
    pub fn history(&self) -> &CheckpointHistory {
        &self.history
    }

    /// A handle to the shared store this session watches.
    #[must_use]
    pub fn store(&self) -> FormStore {
        self.store.clone()
    }
}
