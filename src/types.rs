use crate::sync::UnsafeCell;
use crate::token::Token;
use core::fmt;
use indexmap::IndexSet as _IndexSet;
use rustc_hash::FxBuildHasher;

/// Dense index of a node within its owning graph's node table.
pub type NodeId = usize;

/// A vector of tokens, as produced by a node firing.
pub type TokenVec = Vec<Token>;

/// Ordered routing map: the i-th entry names the `(node, slot)` pair that
/// receives the i-th output value.
pub(crate) type OutputMap = Vec<(NodeId, usize)>;

/// Insertion-ordered set with a fast hasher, used for successor lists.
pub(crate) type IndexSet<T> = _IndexSet<T, FxBuildHasher>;

/// A minimal `UnsafeCell` wrapper that is `Sync` for sendable contents.
///
/// Used for per-run input slots: each slot is written exactly once, by the
/// producing worker, before that worker decrements the consumer's pending
/// counter, and read only by the worker that wins the fired claim. The
/// scheduling protocol rules out conflicting accesses, so the slots need
/// no lock of their own.
#[repr(transparent)]
pub(crate) struct SyncUnsafeCell<T>(UnsafeCell<T>);

unsafe impl<T: Send + Sync> Sync for SyncUnsafeCell<T> {}

impl<T> SyncUnsafeCell<T> {
    pub(crate) fn new(val: T) -> Self {
        Self(UnsafeCell::new(val))
    }

    /// Run `f` with a raw pointer to the contents.
    ///
    /// Dereferencing the pointer is only sound while the caller holds
    /// exclusive access under the scheduling protocol.
    pub(crate) fn with_mut<R>(&self, f: impl FnOnce(*mut T) -> R) -> R {
        #[cfg(feature = "loom")]
        {
            self.0.with_mut(f)
        }
        #[cfg(not(feature = "loom"))]
        {
            f(self.0.get())
        }
    }
}

impl<T> fmt::Debug for SyncUnsafeCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("SyncUnsafeCell { .. }")
    }
}
