//! Debug-only reentrancy guard for the table core.
//!
//! The core invokes caller code (`Hash`, `Eq`, `Disposer`) while the outer
//! mutex is held. A callback that calls back into the same table would
//! deadlock on the non-reentrant lock; in debug builds this guard turns
//! that mistake into a panic at the point of reentry. In release builds it
//! compiles to a no-op.

#[cfg(debug_assertions)]
use core::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Default)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    depth: AtomicU32,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            depth: AtomicU32::new(0),
        }
    }

    /// Enter a guarded section. Panics on nested entry in debug builds.
    ///
    /// The counter is only ever touched by the thread that holds the table
    /// exclusively, so relaxed ordering suffices; the atomic exists to keep
    /// the table `Send + Sync` rather than to synchronize.
    #[inline]
    pub(crate) fn enter(&self) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            let depth = self.depth.load(Ordering::Relaxed);
            assert!(
                depth == 0,
                "table re-entered from a Hash/Eq/Disposer callback"
            );
            self.depth.store(depth + 1, Ordering::Relaxed);
            ReentrancyGuard { owner: self }
        }

        #[cfg(not(debug_assertions))]
        {
            ReentrancyGuard {
                _owner: core::marker::PhantomData,
            }
        }
    }
}

/// RAII guard returned by [`DebugReentrancy::enter`].
pub(crate) struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _owner: core::marker::PhantomData<&'a DebugReentrancy>,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            let depth = self.owner.depth.load(Ordering::Relaxed);
            debug_assert!(depth > 0);
            self.owner.depth.store(depth - 1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DebugReentrancy;

    #[test]
    fn sequential_sections_are_ok() {
        let r = DebugReentrancy::new();
        drop(r.enter());
        drop(r.enter());
    }

    #[cfg(debug_assertions)]
    #[test]
    fn nested_entry_panics_in_debug() {
        let r = DebugReentrancy::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _g1 = r.enter();
            let _g2 = r.enter();
        }));
        assert!(res.is_err(), "expected nested entry to panic in debug builds");
    }
}
