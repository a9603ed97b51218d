//! A singly linked hash chain with lock-free reads and copy-on-write writes.

use crate::error::Error;
use crate::node::Node;
use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned, Shared};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// The list of nodes whose hashes land on one slot of a shard.
///
/// A null head is the empty chain. The head is replaced, never modified, by
/// every insert and delete, so a reader that loaded it sees either the list
/// before or the list after the write. The chain owns every node reachable
/// from its head.
///
/// Writers must be serialized. The shard does that with its own lock and
/// calls the `*_exclusive` methods; the public methods take the chain's
/// internal lock instead and exist for chains that live outside a shard.
pub struct Chain<V> {
    head: Atomic<Node<V>>,
    size: AtomicUsize,
    lock: Mutex<()>,
}

impl<V> Chain<V> {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self {
            head: Atomic::null(),
            size: AtomicUsize::new(0),
            lock: Mutex::new(()),
        }
    }

    /// The first node, or `None` if the chain is empty.
    ///
    /// The node is borrowed from both the chain and the guard.
    pub fn head<'g>(&'g self, guard: &'g Guard) -> Option<&'g Node<V>> {
        // SAFETY: nodes reachable through a pinned guard stay allocated.
        unsafe { self.head.load(Ordering::Acquire, guard).as_ref() }
    }

    /// Walk the chain from its current head.
    pub fn nodes<'g>(&'g self, guard: &'g Guard) -> Nodes<'g, V> {
        Nodes {
            current: self.head(guard),
            guard,
        }
    }

    /// Find the node holding `key`. Never blocks and is never blocked.
    ///
    /// ```rust
    /// use chainmap::{Chain, Node};
    ///
    /// let guard = &crossbeam_epoch::pin();
    /// let chain = Chain::new();
    /// chain.put(Node::new("a", 0, 1), guard)?;
    /// assert_eq!(*chain.get("a", guard).unwrap().value(guard), 1);
    /// # Ok::<(), chainmap::Error>(())
    /// ```
    ///
    /// A found node cannot outlive its chain, even while the guard is pinned:
    ///
    /// ```rust,compile_fail
    /// use chainmap::{Chain, Node};
    ///
    /// let guard = &crossbeam_epoch::pin();
    /// let chain = Chain::new();
    /// chain.put(Node::new("a", 0, 1), guard).unwrap();
    /// let node = chain.get("a", guard).unwrap();
    /// drop(chain);
    /// assert_eq!(node.key(), "a");
    /// ```
    pub fn get<'g>(&'g self, key: &str, guard: &'g Guard) -> Option<&'g Node<V>> {
        self.nodes(guard).find(|node| node.key() == key)
    }

    /// Number of pairs in the chain.
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }
}

impl<V: Send + Sync + 'static> Chain<V> {
    /// Insert `node`, or replace the value of the node with the same key.
    ///
    /// Returns `true` when a new pair was linked and `false` on update.
    pub fn put(&self, node: Node<V>, guard: &Guard) -> Result<bool, Error> {
        let _lock = self.lock.lock();
        // SAFETY: writers are serialized by the internal lock held above.
        unsafe { self.put_exclusive(node, guard) }
    }

    /// Remove the pair with `key`. Returns `false` if it was absent.
    pub fn delete(&self, key: &str, guard: &Guard) -> bool {
        let _lock = self.lock.lock();
        // SAFETY: writers are serialized by the internal lock held above.
        unsafe { self.delete_exclusive(key, guard) }
    }

    /// Remove every pair.
    pub fn clear(&self, guard: &Guard) {
        let _lock = self.lock.lock();
        // SAFETY: writers are serialized by the internal lock held above.
        unsafe { self.clear_exclusive(guard) }
    }

    /// `put` without taking the internal lock.
    ///
    /// # Safety
    ///
    /// The caller must hold the lock that serializes every writer of this
    /// chain.
    pub(crate) unsafe fn put_exclusive(&self, node: Node<V>, guard: &Guard) -> Result<bool, Error> {
        if node.is_linked(guard) {
            return Err(Error::InvalidPairType(format!(
                "node for key {:?} is already linked into a chain",
                node.key()
            )));
        }

        let head = self.head.load(Ordering::Acquire, guard);
        if let Some(existing) = self.nodes(guard).find(|n| n.key() == node.key()) {
            existing.set_value(node.into_value(), guard);
            return Ok(false);
        }

        // Link before publishing: a reader that sees the new head also sees
        // the whole previous list behind it.
        let node = Owned::new(node);
        node.set_next(head);
        self.head.store(node, Ordering::Release);
        self.size.fetch_add(1, Ordering::AcqRel);
        Ok(true)
    }

    /// `delete` without taking the internal lock.
    ///
    /// The predecessors of the target are copied onto the target's
    /// successor and the copy is published as the new head. Nodes that an
    /// in-flight reader may hold are never modified; they are retired.
    ///
    /// # Safety
    ///
    /// The caller must hold the lock that serializes every writer of this
    /// chain.
    pub(crate) unsafe fn delete_exclusive(&self, key: &str, guard: &Guard) -> bool {
        let mut predecessors: Vec<Shared<'_, Node<V>>> = Vec::new();
        let mut current = self.head.load(Ordering::Acquire, guard);
        let target = loop {
            let Some(node) = current.as_ref() else {
                return false;
            };
            if node.key() == key {
                break current;
            }
            predecessors.push(current);
            current = node.next.load(Ordering::Acquire, guard);
        };

        let mut rebuilt = target.deref().next.load(Ordering::Acquire, guard);
        for predecessor in predecessors.iter().rev() {
            let copy = Owned::new(predecessor.deref().copy(guard));
            copy.set_next(rebuilt);
            rebuilt = copy.into_shared(guard);
        }
        self.head.store(rebuilt, Ordering::Release);
        self.size.fetch_sub(1, Ordering::AcqRel);

        for predecessor in predecessors {
            guard.defer_destroy(predecessor);
        }
        guard.defer_destroy(target);
        true
    }

    /// `clear` without taking the internal lock.
    ///
    /// # Safety
    ///
    /// The caller must hold the lock that serializes every writer of this
    /// chain.
    pub(crate) unsafe fn clear_exclusive(&self, guard: &Guard) {
        let mut current = self.head.swap(Shared::null(), Ordering::AcqRel, guard);
        self.size.store(0, Ordering::Release);
        while let Some(node) = current.as_ref() {
            let next = node.next.load(Ordering::Acquire, guard);
            guard.defer_destroy(current);
            current = next;
        }
    }
}

impl<V> Default for Chain<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Drop for Chain<V> {
    fn drop(&mut self) {
        // SAFETY: dropping needs exclusive access, and the chain owns every
        // node reachable from its head.
        unsafe {
            let guard = epoch::unprotected();
            let mut current = self.head.load(Ordering::Relaxed, guard);
            while let Some(node) = current.as_ref() {
                let next = node.next.load(Ordering::Relaxed, guard);
                drop(current.into_owned());
                current = next;
            }
        }
    }
}

impl<V: fmt::Debug> fmt::Display for Chain<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = &epoch::pin();
        f.write_str("[ ")?;
        for node in self.nodes(guard) {
            write!(f, "{} ", node)?;
        }
        f.write_str("]")
    }
}

/// Iterator over the nodes of a chain, from head to tail.
pub struct Nodes<'g, V> {
    current: Option<&'g Node<V>>,
    guard: &'g Guard,
}

impl<'g, V> Iterator for Nodes<'g, V> {
    type Item = &'g Node<V>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current?;
        self.current = node.next(self.guard);
        Some(node)
    }
}
