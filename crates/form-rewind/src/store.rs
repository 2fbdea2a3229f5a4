#![forbid(unsafe_code)]

//! Reactive form-value container with change notification and origin tags.
//!
//! # Design
//!
//! [`FormStore`] wraps the live [`FormValues`] in shared, reference-counted
//! storage (`Rc<RefCell<..>>`). When the value changes (by defined-field
//! equality), the version counter increments and all live subscribers are
//! notified in registration order.
//!
//! Every write carries a [`WriteOrigin`]: `User` for host/form edits, and
//! `History` for values written back by undo/redo/reset. The autosave
//! observer reads the origin of the latest write to tell self-inflicted
//! updates apart from real edits, instead of comparing object identities.
//!
//! # Failure Modes
//!
//! - **Re-entrant set**: calling `set()` from within a subscriber callback
//!   is safe; callbacks run after the interior borrow is released.
//! - **Subscriber leak**: holding [`StoreSubscription`] guards forever
//!   accumulates callbacks. Dead weak references are pruned lazily during
//!   notification.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::values::FormValues;

/// Who performed the most recent write into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOrigin {
    /// The host form layer (a user edit).
    User,
    /// The checkpoint history (undo/redo/reset writing a snapshot back).
    History,
}

type CallbackRc = Rc<dyn Fn(&FormValues, WriteOrigin)>;
type CallbackWeak = Weak<dyn Fn(&FormValues, WriteOrigin)>;

struct StoreInner {
    values: FormValues,
    version: u64,
    origin: WriteOrigin,
    /// Subscribers stored as weak references. Dead entries are pruned on notify.
    subscribers: Vec<CallbackWeak>,
}

/// A shared, version-tracked form-value container.
///
/// Cloning a `FormStore` creates a new handle to the **same** inner state —
/// both handles see the same values and share subscribers.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each value-changing write.
/// 2. A write equal (defined-field equality) to the current value is a no-op.
/// 3. Subscribers are notified in registration order.
/// 4. A write is visible to every subsequent `get()` before any later write
///    is processed (single-threaded interior).
pub struct FormStore {
    inner: Rc<RefCell<StoreInner>>,
}

impl Clone for FormStore {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for FormStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("FormStore")
            .field("version", &inner.version)
            .field("origin", &inner.origin)
            .field("field_count", &inner.values.len())
            .field("subscriber_count", &inner.subscribers.len())
            .finish()
    }
}

impl FormStore {
    /// Create a store holding the given initial values.
    ///
    /// The initial version is 0 and the origin is [`WriteOrigin::User`]
    /// (the initial values come from the host, not from history).
    #[must_use]
    pub fn new(values: FormValues) -> Self {
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                values,
                version: 0,
                origin: WriteOrigin::User,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Get a clone of the current values.
    #[must_use]
    pub fn get(&self) -> FormValues {
        self.inner.borrow().values.clone()
    }

    /// Access the current values by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&FormValues) -> R) -> R {
        f(&self.inner.borrow().values)
    }

    /// Replace the current values (a user edit).
    ///
    /// No-op if the new values equal the current ones.
    pub fn set(&self, values: FormValues) {
        self.set_with_origin(values, WriteOrigin::User);
    }

    /// Replace the current values on behalf of the checkpoint history.
    pub(crate) fn set_from_history(&self, values: FormValues) {
        self.set_with_origin(values, WriteOrigin::History);
    }

    fn set_with_origin(&self, values: FormValues, origin: WriteOrigin) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.values == values {
                return;
            }
            inner.values = values;
            inner.version += 1;
            inner.origin = origin;
            debug!(version = inner.version, ?origin, "form values replaced");
        }
        self.notify(origin);
    }

    /// Version of the current values. Increments by 1 on each
    /// value-changing write; useful for dirty-checking in tick loops.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Origin of the most recent write.
    #[must_use]
    pub fn last_origin(&self) -> WriteOrigin {
        self.inner.borrow().origin
    }

    /// Subscribe to value changes. The callback receives the new values and
    /// the origin of the write.
    ///
    /// Returns a [`StoreSubscription`] guard; dropping it unsubscribes.
    pub fn subscribe(
        &self,
        callback: impl Fn(&FormValues, WriteOrigin) + 'static,
    ) -> StoreSubscription {
        let strong: CallbackRc = Rc::new(callback);
        let weak = Rc::downgrade(&strong);
        self.inner.borrow_mut().subscribers.push(weak);
        StoreSubscription { _guard: strong }
    }

    /// Number of registered subscribers (including dead ones not yet pruned).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Notify live subscribers and prune dead ones.
    fn notify(&self, origin: WriteOrigin) {
        // Collect live callbacks first so the borrow is released before
        // any callback runs (callbacks may read or write the store).
        let callbacks: Vec<CallbackRc> = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|w| w.strong_count() > 0);
            inner.subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        if callbacks.is_empty() {
            return;
        }
        let values = self.inner.borrow().values.clone();
        for cb in &callbacks {
            cb(&values, origin);
        }
    }
}

/// RAII guard for a store subscriber.
///
/// Dropping the guard drops the strong reference to the callback; the
/// store's weak entry fails to upgrade and is pruned on the next notify.
pub struct StoreSubscription {
    _guard: CallbackRc,
}

impl std::fmt::Debug for StoreSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreSubscription").finish_non_exhaustive()
    }
}
