//! SkipList implementation
//!
//! Arena-backed skip list with per-level index links.

use std::borrow::Borrow;
use std::fmt;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::MAX_LEVEL;

/// Arena index of a node. As a predecessor, `None` is the head sentinel.
type Link = Option<usize>;

/// A single tower in the list
struct Node<K, V> {
    key: K,
    value: V,

    /// One forward link per level this node participates in
    forward: Vec<Link>,
}

/// Ordered map with expected logarithmic operations
pub struct SkipList<K, V> {
    /// Forward links of the head sentinel, one per possible level
    head: [Link; MAX_LEVEL],

    /// Node arena; `None` marks a vacant slot
    slots: Vec<Option<Node<K, V>>>,

    /// Vacant slot indices available for reuse
    free: Vec<usize>,

    /// Number of populated levels (0 when empty)
    level: usize,

    /// Number of live entries
    len: usize,

    /// Source of tower heights
    rng: SmallRng,
}

impl<K: Ord, V> SkipList<K, V> {
    /// Create an empty list seeded from OS entropy
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    /// Create an empty list with a deterministic height sequence
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            head: [None; MAX_LEVEL],
            slots: Vec::new(),
            free: Vec::new(),
            level: 0,
            len: 0,
            rng,
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of currently populated levels
    pub fn level(&self) -> usize {
        self.level
    }

    /// Insert or overwrite a key
    ///
    /// Returns the previous value when the key was already present. An
    /// overwrite replaces the value in place and leaves the tower untouched.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        // Step 1: Record the rightmost node before `key` on every level
        let update = self.predecessors(&key);

        // Step 2: Existing key - replace in place
        if let Some(idx) = self.next(update[0], 0) {
            let node = self.node_mut(idx);
            if node.key == key {
                return Some(std::mem::replace(&mut node.value, value));
            }
        }

        // Step 3: Sample a height. Levels above the current top already
        // have the head as predecessor (`None` in `update`).
        let height = self.random_level();
        if height > self.level {
            self.level = height;
        }

        // Step 4: Splice the new tower into levels 0..height
        let forward = (0..height)
            .map(|level| self.next(update[level], level))
            .collect();
        let idx = self.allocate(Node {
            key,
            value,
            forward,
        });
        for (level, &pred) in update.iter().enumerate().take(height) {
            self.set_next(pred, level, Some(idx));
        }

        self.len += 1;
        None
    }

    /// Look up a key
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(|idx| &self.node(idx).value)
    }

    /// Look up a key for in-place mutation
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let idx = self.find(key)?;
        Some(&mut self.node_mut(idx).value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Remove a key, returning its value if it was present
    ///
    /// After unlinking, the list level shrinks while the head's topmost
    /// forward link is empty.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let update = self.predecessors(key);
        let target = self
            .next(update[0], 0)
            .filter(|&idx| self.key_matches(idx, key))?;

        // A predecessor that no longer points at the target means the tower
        // does not reach this level, nor any above it.
        for (level, &pred) in update.iter().enumerate().take(self.level) {
            if self.next(pred, level) != Some(target) {
                break;
            }
            let after = self.node(target).forward[level];
            self.set_next(pred, level, after);
        }

        let node = self.release(target);
        while self.level > 0 && self.head[self.level - 1].is_none() {
            self.level -= 1;
        }

        self.len -= 1;
        Some(node.value)
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.head = [None; MAX_LEVEL];
        self.slots.clear();
        self.free.clear();
        self.level = 0;
        self.len = 0;
    }

    /// In-order iterator over the level-0 chain
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            list: self,
            next: self.head[0],
            remaining: self.len,
        }
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    /// Walk right on `level` from `curr` while the next key is below `key`
    fn advance<Q>(&self, mut curr: Link, level: usize, key: &Q) -> Link
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        while let Some(next) = self.next(curr, level) {
            let candidate: &Q = self.node(next).key.borrow();
            if candidate < key {
                curr = Some(next);
            } else {
                break;
            }
        }
        curr
    }

    fn predecessors<Q>(&self, key: &Q) -> [Link; MAX_LEVEL]
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut update = [None; MAX_LEVEL];
        let mut curr = None;
        for level in (0..self.level).rev() {
            curr = self.advance(curr, level, key);
            update[level] = curr;
        }
        update
    }

    fn find<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut curr = None;
        for level in (0..self.level).rev() {
            curr = self.advance(curr, level, key);
        }
        self.next(curr, 0).filter(|&idx| self.key_matches(idx, key))
    }

    fn key_matches<Q>(&self, idx: usize, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let candidate: &Q = self.node(idx).key.borrow();
        candidate == key
    }

    fn next(&self, from: Link, level: usize) -> Link {
        match from {
            None => self.head[level],
            Some(idx) => self.node(idx).forward[level],
        }
    }

    fn set_next(&mut self, from: Link, level: usize, to: Link) {
        match from {
            None => self.head[level] = to,
            Some(idx) => self.node_mut(idx).forward[level] = to,
        }
    }

    fn node(&self, idx: usize) -> &Node<K, V> {
        match &self.slots[idx] {
            Some(node) => node,
            None => unreachable!("skip list link to vacant slot {idx}"),
        }
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<K, V> {
        match &mut self.slots[idx] {
            Some(node) => node,
            None => unreachable!("skip list link to vacant slot {idx}"),
        }
    }

    fn allocate(&mut self, node: Node<K, V>) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, idx: usize) -> Node<K, V> {
        match self.slots[idx].take() {
            Some(node) => {
                self.free.push(idx);
                node
            }
            None => unreachable!("double release of skip list slot {idx}"),
        }
    }

    /// Geometric height: P(h = L) = 0.5^L, capped at MAX_LEVEL
    fn random_level(&mut self) -> usize {
        let mut level = 1;
        while level < MAX_LEVEL && self.rng.gen_bool(0.5) {
            level += 1;
        }
        level
    }
}

impl<K: Ord, V> Default for SkipList<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + fmt::Debug, V: fmt::Debug> fmt::Debug for SkipList<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K: Ord, V> IntoIterator for &'a SkipList<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over SkipList entries in key order
pub struct Iter<'a, K, V> {
    list: &'a SkipList<K, V>,
    next: Link,
    remaining: usize,
}

impl<'a, K: Ord, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.next?;
        let node = self.list.node(idx);
        self.next = node.forward[0];
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Ord, V> ExactSizeIterator for Iter<'_, K, V> {}
