#![forbid(unsafe_code)]

//! form-rewind
//!
//! Checkpoint history, undo/redo, and throttled autosave for reactive form
//! state. The crate watches a stream of form-value edits, filters the noisy
//! keystroke-level transitions down to a small number of meaningful history
//! entries, and exposes linear undo/redo/reset navigation over them.
//!
//! # Key Components
//!
//! - [`FormValues`] - A form snapshot: field name → JSON value, with
//!   defined-field equality and dotted-path diffing
//! - [`FormStore`] - The shared reactive value container the host edits
//!   through, with origin-tagged writes and change notification
//! - [`Throttler`] / [`Debouncer`] - Deadline-polled coalescing primitives
//!   pacing how often checkpoints are recorded
//! - [`CheckpointPicker`] - Strategy deciding whether an edit transition is
//!   worth recording; built-ins: [`WordEditingPicker`],
//!   [`EditedFieldChangedPicker`]
//! - [`CheckpointHistory`] - The undo/redo state machine: checkpoints,
//!   cursor, equivalences
//! - [`AutoSave`] - The orchestrator wiring the edit stream through the
//!   picker policy and the throttler into the history
//! - [`UndoSession`] - One editing session; the surface a host integrates
//!   against
//!
//! # How it fits together
//!
//! The host writes edits into a [`FormStore`] and calls
//! [`UndoSession::tick`] with the current instant. The session observes
//! each value transition, consults the picker policy, and records
//! checkpoints — immediately at hard boundaries (a field switch), or after
//! the throttle window during continuous typing. Undo/redo/reset write a
//! stored checkpoint back into the store, tagged so the observer never
//! mistakes them for user edits.

pub mod autosave;
pub mod coalesce;
pub mod error;
pub mod history;
pub mod picker;
pub mod session;
pub mod store;
pub mod values;

pub use autosave::{AutoSave, AutoSaveConfig};
pub use coalesce::{Debouncer, Throttler};
pub use error::RewindError;
pub use history::CheckpointHistory;
pub use picker::{
    CheckpointPicker, CheckpointPolicy, EditedFieldChangedPicker, PolicyOutcome, SaveAction,
    SaveRequest, WordEditingPicker,
};
pub use session::UndoSession;
pub use store::{FormStore, StoreSubscription, WriteOrigin};
pub use values::{FormValues, ValuesDiff, values_diff};
