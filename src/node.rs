use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned, Shared};
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// One key-value entry of a chain.
///
/// The key and its hash never change. The value sits in its own heap slot
/// that is swapped out wholesale on update, so a reader that loaded the old
/// slot keeps a consistent value. The `next` link is only written while the
/// node is being linked into a chain.
pub struct Node<V> {
    key: String,
    hash: u64,
    value: Atomic<Arc<V>>,
    pub(crate) next: Atomic<Node<V>>,
}

impl<V> Node<V> {
    /// Create a detached node. `hash` must come from the same hasher the
    /// owning map uses for routing.
    pub fn new(key: impl Into<String>, hash: u64, value: V) -> Self {
        Self::with_arc(key.into(), hash, Arc::new(value))
    }

    pub(crate) fn with_arc(key: String, hash: u64, value: Arc<V>) -> Self {
        Self {
            key,
            hash,
            value: Atomic::new(value),
            next: Atomic::null(),
        }
    }

    /// The key of this node.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The hash computed for the key when the node was created.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Load the current value.
    pub fn value(&self, guard: &Guard) -> Arc<V> {
        let slot = self.value.load(Ordering::Acquire, guard);
        // SAFETY: the slot is never null while the node is reachable, and a
        // replaced slot is only destroyed after every pinned guard is gone.
        unsafe { slot.deref() }.clone()
    }

    /// Replace the value. The previous slot is retired, never modified.
    pub fn set_value(&self, value: Arc<V>, guard: &Guard) {
        let old = self.value.swap(Owned::new(value), Ordering::AcqRel, guard);
        if !old.is_null() {
            // SAFETY: `old` was unlinked by the swap above, so no new reader
            // can reach it.
            unsafe { guard.defer_destroy(old) };
        }
    }

    /// The next node of the chain, if any.
    pub fn next<'g>(&'g self, guard: &'g Guard) -> Option<&'g Node<V>> {
        // SAFETY: nodes reachable through a pinned guard stay allocated.
        unsafe { self.next.load(Ordering::Acquire, guard).as_ref() }
    }

    /// Point this node at `next`. A null pointer clears the link.
    pub(crate) fn set_next(&self, next: Shared<'_, Node<V>>) {
        self.next.store(next, Ordering::Release);
    }

    pub(crate) fn is_linked(&self, guard: &Guard) -> bool {
        !self.next.load(Ordering::Relaxed, guard).is_null()
    }

    /// A detached copy with the same key, hash and value.
    pub fn copy(&self, guard: &Guard) -> Node<V> {
        Self::with_arc(self.key.clone(), self.hash, self.value(guard))
    }

    /// Consume a node that was never shared and hand back its value.
    pub(crate) fn into_value(self) -> Arc<V> {
        // SAFETY: `self` is owned, so no other thread can observe the slot.
        let slot = unsafe {
            self.value
                .swap(Shared::null(), Ordering::Relaxed, epoch::unprotected())
                .into_owned()
        };
        *slot.into_box()
    }
}

impl<V> Drop for Node<V> {
    fn drop(&mut self) {
        // SAFETY: a node is dropped only once no guard can reach it, so its
        // current value slot is exclusively ours. `next` is not followed: the
        // successor belongs to the chain.
        unsafe {
            let slot = self.value.load(Ordering::Relaxed, epoch::unprotected());
            if !slot.is_null() {
                drop(slot.into_owned());
            }
        }
    }
}

impl<V: fmt::Debug> fmt::Display for Node<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = &epoch::pin();
        write!(
            f,
            "node{{key: {}, hash: {}, value: {:?}, next_key: ",
            self.key,
            self.hash,
            self.value(guard)
        )?;
        if let Some(next) = self.next(guard) {
            f.write_str(next.key())?;
        }
        f.write_str("}")
    }
}
