//! Recency Index
//!
//! A doubly-linked ordering of live keys from most- to least-recently
//! touched. The head is the newest key; the tail is the eviction
//! candidate. Nodes live in a slab (`Vec` plus free list) and a side map
//! resolves a key to its slot, so `touch`, `forget`, and tail reads are
//! all O(1).
//!
//! The index carries no synchronization of its own: it is owned by the
//! keyspace and only reached under its write lock.

use bytes::Bytes;
use std::collections::HashMap;

#[derive(Debug)]
struct Node {
    key: Bytes,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Newest-first ordering over live keys.
#[derive(Debug, Default)]
pub struct RecencyList {
    nodes: Vec<Node>,
    index: HashMap<Bytes, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    free: Vec<usize>,
}

impl RecencyList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `key` to the head, inserting it if absent.
    pub fn touch(&mut self, key: &Bytes) {
        if let Some(&slot) = self.index.get(key) {
            if self.head == Some(slot) {
                return;
            }
            self.detach(slot);
            self.link_front(slot);
        } else {
            let slot = self.allocate(key.clone());
            self.index.insert(key.clone(), slot);
            self.link_front(slot);
        }
    }

    /// Drops `key` from the ordering.
    ///
    /// # Returns
    ///
    /// `true` if the key was present.
    pub fn forget(&mut self, key: &Bytes) -> bool {
        match self.index.remove(key) {
            Some(slot) => {
                self.detach(slot);
                self.nodes[slot].key = Bytes::new();
                self.free.push(slot);
                true
            }
            None => false,
        }
    }

    /// The least-recently touched key, or `None` when the ordering is
    /// empty.
    pub fn oldest(&self) -> Option<&Bytes> {
        self.tail.map(|slot| &self.nodes[slot].key)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn allocate(&mut self, key: Bytes) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Node {
                    key,
                    prev: None,
                    next: None,
                };
                slot
            }
            None => {
                self.nodes.push(Node {
                    key,
                    prev: None,
                    next: None,
                });
                self.nodes.len() - 1
            }
        }
    }

    /// Unlinks `slot` from its neighbors without freeing it.
    fn detach(&mut self, slot: usize) {
        let (prev, next) = (self.nodes[slot].prev, self.nodes[slot].next);
        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }
        self.nodes[slot].prev = None;
        self.nodes[slot].next = None;
    }

    fn link_front(&mut self, slot: usize) {
        self.nodes[slot].prev = None;
        self.nodes[slot].next = self.head;
        if let Some(old_head) = self.head {
            self.nodes[old_head].prev = Some(slot);
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }
}
