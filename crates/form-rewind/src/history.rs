#![forbid(unsafe_code)]

//! Linear checkpoint history with cursor-based undo/redo.
//!
//! [`CheckpointHistory`] keeps an ordered list of snapshots and a cursor
//! marking the current one. Navigation moves the cursor; appending at a
//! non-tip cursor discards the stale redo tail first.
//!
//! ```text
//! append(s3)
//! ┌──────────────────────────────────────────────┐
//! │ Checkpoints: [s0, s1, s2, s3]                │
//! │ Cursor:                   ▲                  │
//! └──────────────────────────────────────────────┘
//!
//! undo() x2
//! ┌──────────────────────────────────────────────┐
//! │ Checkpoints: [s0, s1, s2, s3]                │
//! │ Cursor:           ▲        (redoable: 2)     │
//! └──────────────────────────────────────────────┘
//!
//! append(s4) — new branch, discards s2 and s3
//! ┌──────────────────────────────────────────────┐
//! │ Checkpoints: [s0, s1, s4]                    │
//! │ Cursor:               ▲                      │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The live form value is not stored here; operations that depend on it
//! take it as a parameter. "Diverged" means the live value no longer
//! matches the checkpoint at the cursor, where matching honors the
//! *equivalence* relation: snapshots registered as equivalent to a
//! checkpoint (say, a trailing-whitespace variant) count as that
//! checkpoint for every comparison.
//!
//! # Invariants
//!
//! 1. `0 <= cursor < checkpoints.len()` after every operation.
//! 2. `checkpoints[0]` is the initial form value and is never removed.
//! 3. Appending at a non-tip cursor truncates everything past the cursor
//!    before pushing.
//! 4. `undoable_count = cursor + 1` when diverged, else `cursor`.
//! 5. `redoable_count = 0` when diverged, else `len - cursor - 1`.

use tracing::{debug, warn};

use crate::error::RewindError;
use crate::values::FormValues;

/// The undo/redo state machine over form-value snapshots.
pub struct CheckpointHistory {
    /// Stored snapshots, oldest first. Index 0 is the initial form value.
    checkpoints: Vec<FormValues>,
    /// Index of the current checkpoint.
    cursor: usize,
    /// Checkpoint value → snapshots treated as matching it.
    equivalences: Vec<(FormValues, Vec<FormValues>)>,
    /// The last snapshot this history wrote back to the store, used to
    /// ignore re-observations of our own writes.
    last_self_write: Option<FormValues>,
}

impl std::fmt::Debug for CheckpointHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointHistory")
            .field("len", &self.checkpoints.len())
            .field("cursor", &self.cursor)
            .field("equivalence_entries", &self.equivalences.len())
            .finish()
    }
}

impl CheckpointHistory {
    /// Create a history seeded with the form's initial values.
    #[must_use]
    pub fn new(initial: FormValues) -> Self {
        Self {
            checkpoints: vec![initial],
            cursor: 0,
            equivalences: Vec::new(),
            last_self_write: None,
        }
    }

    // ====================================================================
    // Query
    // ====================================================================

    /// The checkpoint at the cursor.
    #[must_use]
    pub fn current(&self) -> &FormValues {
        &self.checkpoints[self.cursor]
    }

    /// Number of stored checkpoints (always at least 1).
    #[must_use]
    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }

    /// Cursor position.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The checkpoint at `index`, if in bounds.
    #[must_use]
    pub fn checkpoint_at(&self, index: usize) -> Option<&FormValues> {
        self.checkpoints.get(index)
    }

    /// Whether `live` has drifted away from the current checkpoint,
    /// honoring equivalences.
    #[must_use]
    pub fn diverged(&self, live: &FormValues) -> bool {
        !self.matches(live, &self.checkpoints[self.cursor])
    }

    /// Number of states an `undo` can reach, counting an uncommitted
    /// divergence as one.
    #[must_use]
    pub fn undoable_count(&self, live: &FormValues) -> usize {
        self.cursor + usize::from(self.diverged(live))
    }

    /// Number of states a `redo` can reach. Divergence invalidates the
    /// redo tail.
    #[must_use]
    pub fn redoable_count(&self, live: &FormValues) -> usize {
        if self.diverged(live) {
            0
        } else {
            self.checkpoints.len() - self.cursor - 1
        }
    }

    /// Whether `values` was the last snapshot this history wrote back.
    #[must_use]
    pub fn wrote_last(&self, values: &FormValues) -> bool {
        self.last_self_write
            .as_ref()
            .is_some_and(|last| self.matches(values, last))
    }

    // ====================================================================
    // Mutation
    // ====================================================================

    /// Register `equivalent` as matching `target` for all future
    /// comparisons.
    pub fn add_equivalence(&mut self, target: FormValues, equivalent: FormValues) {
        match self.equivalences.iter_mut().find(|(t, _)| *t == target) {
            Some((_, list)) => list.push(equivalent),
            None => self.equivalences.push((target, vec![equivalent])),
        }
    }

    /// Record a new checkpoint.
    ///
    /// No-op when `values` matches the last snapshot this history wrote
    /// back (our own write echoed around), or when it matches the current
    /// checkpoint (nothing changed). Otherwise the redo tail is discarded
    /// and `values` becomes the new tip.
    ///
    /// Returns whether a checkpoint was recorded.
    pub fn append(&mut self, values: &FormValues) -> bool {
        if self.wrote_last(values) {
            debug!("append skipped: value was written by the history itself");
            return false;
        }
        if self.matches(values, &self.checkpoints[self.cursor]) {
            debug!("append skipped: value matches the current checkpoint");
            return false;
        }
        self.checkpoints.truncate(self.cursor + 1);
        self.checkpoints.push(values.clone());
        self.cursor += 1;
        debug!(cursor = self.cursor, len = self.checkpoints.len(), "checkpoint recorded");
        true
    }

    /// Move the cursor to `index` and return the snapshot the caller must
    /// write back into the value container. The snapshot is remembered as
    /// this history's own write.
    ///
    /// # Errors
    ///
    /// Returns [`RewindError::CheckpointOutOfBounds`] when `index` is not
    /// in `[0, len)`.
    pub fn jump_to(&mut self, index: usize) -> Result<&FormValues, RewindError> {
        if index >= self.checkpoints.len() {
            return Err(RewindError::CheckpointOutOfBounds {
                index,
                len: self.checkpoints.len(),
            });
        }
        self.cursor = index;
        let checkpoint = &self.checkpoints[index];
        self.last_self_write = Some(checkpoint.clone());
        Ok(checkpoint)
    }

    /// Step one state back.
    ///
    /// When `live` has diverged, the divergence itself is the state being
    /// undone: the live value is preserved past the cursor (reachable by a
    /// later `redo`) and the current checkpoint is re-issued. Otherwise the
    /// cursor steps back, or warns and no-ops at the first checkpoint.
    ///
    /// Returns the snapshot to write back, if navigation happened.
    pub fn undo(&mut self, live: &FormValues) -> Option<&FormValues> {
        if self.diverged(live) {
            self.checkpoints.truncate(self.cursor + 1);
            self.checkpoints.push(live.clone());
            let cursor = self.cursor;
            return self.jump_to(cursor).ok();
        }
        if self.cursor == 0 {
            warn!("undo ignored: already at the initial checkpoint");
            return None;
        }
        let target = self.cursor - 1;
        self.jump_to(target).ok()
    }

    /// Step one state forward.
    ///
    /// Warns and no-ops when the redo tail was invalidated by uncommitted
    /// edits or the cursor is at the tip.
    pub fn redo(&mut self, live: &FormValues) -> Option<&FormValues> {
        if self.diverged(live) {
            warn!("redo ignored: uncommitted edits invalidated the redo history");
            return None;
        }
        if self.cursor + 1 >= self.checkpoints.len() {
            warn!("redo ignored: already at the newest checkpoint");
            return None;
        }
        let target = self.cursor + 1;
        self.jump_to(target).ok()
    }

    /// Jump back to the initial checkpoint, preserving a diverged live
    /// value for redo exactly as [`undo`](Self::undo) does.
    pub fn reset(&mut self, live: &FormValues) -> Option<&FormValues> {
        if self.diverged(live) {
            self.checkpoints.truncate(self.cursor + 1);
            self.checkpoints.push(live.clone());
        } else if self.cursor == 0 {
            debug!("reset ignored: already at the initial checkpoint");
            return None;
        }
        self.jump_to(0).ok()
    }

    fn matches(&self, values: &FormValues, checkpoint: &FormValues) -> bool {
        if values == checkpoint {
            return true;
        }
        self.equivalences
            .iter()
            .find(|(target, _)| target == checkpoint)
            .is_some_and(|(_, list)| list.iter().any(|eq| eq == values))
    }
}
