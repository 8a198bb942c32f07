//! Debug-only reentrancy check.
//!
//! Both collections call into user code while walking their storage:
//! `Eq` while scanning a chain or probing the vertex index, `Hash` and
//! `BucketKey` while computing where to look. A user impl that reaches
//! back into the same collection at that point would observe it
//! half-updated, so every public entry point marks the collection busy for
//! its duration. Debug builds panic on nested entry; release builds keep
//! no state at all.

#[cfg(debug_assertions)]
use core::cell::Cell;
use core::marker::PhantomData;

/// Busy flag embedded in a collection. Also makes its owner `!Send` and
/// `!Sync`, matching the single-caller model.
#[derive(Debug)]
pub(crate) struct ReentryCheck {
    #[cfg(debug_assertions)]
    busy: Cell<bool>,
    _single_threaded: PhantomData<*mut ()>,
}

impl ReentryCheck {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            busy: Cell::new(false),
            _single_threaded: PhantomData,
        }
    }

    /// Marks the owner busy until the returned token is dropped.
    #[inline]
    #[track_caller]
    pub(crate) fn enter(&self) -> Entered<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.busy.replace(true),
                "collection re-entered from user code during an operation"
            );
            Entered { check: self }
        }

        #[cfg(not(debug_assertions))]
        {
            Entered {
                _check: PhantomData,
            }
        }
    }
}

pub(crate) struct Entered<'a> {
    #[cfg(debug_assertions)]
    check: &'a ReentryCheck,
    #[cfg(not(debug_assertions))]
    _check: PhantomData<&'a ReentryCheck>,
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.check.busy.set(false);
    }
}
