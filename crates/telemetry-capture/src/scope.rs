//! Per-thread accumulator storage.
//!
//! Each thread owns at most one [`UsageAccumulator`]. It is created lazily by
//! [`with_current`] and must be removed with [`discard`] (or by dropping a
//! [`ScopeGuard`]) when the operation ends, otherwise a pooled thread carries
//! it into the next operation.

use crate::UsageAccumulator;
use std::cell::RefCell;
use std::marker::PhantomData;

thread_local! {
    static CURRENT: RefCell<Option<UsageAccumulator>> = const { RefCell::new(None) };
}

/// Run `f` against the calling thread's accumulator, creating it first if
/// needed.
///
/// # Panics
///
/// Panics if called re-entrantly from inside `f`.
pub fn with_current<R>(f: impl FnOnce(&mut UsageAccumulator) -> R) -> R {
    CURRENT.with(|cell| {
        let mut slot = cell.borrow_mut();
        f(slot.get_or_insert_with(UsageAccumulator::new))
    })
}

/// Detach the calling thread's accumulator.
pub fn discard() -> Option<UsageAccumulator> {
    CURRENT.with(|cell| cell.borrow_mut().take())
}

/// Whether the calling thread currently holds an accumulator.
pub fn is_active() -> bool {
    CURRENT.with(|cell| cell.borrow().is_some())
}

/// Discards the thread's accumulator when dropped.
///
/// Not `Send`: the guard must be dropped on the thread that entered the
/// scope.
#[must_use = "the scope ends as soon as the guard is dropped"]
pub struct ScopeGuard {
    _not_send: PhantomData<*const ()>,
}

impl ScopeGuard {
    /// Start a scope with a fresh accumulator, dropping any left over from an
    /// earlier operation on this thread.
    pub fn enter() -> Self {
        if discard().is_some() {
            tracing::warn!("discarded usage accumulator left over from a previous scope");
        }
        with_current(|_| ());
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        discard();
    }
}
