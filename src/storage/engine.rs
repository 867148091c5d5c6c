//! Storage Engine
//!
//! The authoritative keyspace for the database: one map from key to
//! [`Value`], a recency ordering used to pick eviction victims, and a
//! membership filter used to short-circuit lookups of absent keys. All
//! three are guarded together by a single readers-writer lock, so every
//! invariant can be stated against one consistent view:
//!
//! - a key is in the map iff it is in the recency ordering;
//! - every live key has its filter bit set (the converse may not hold);
//! - the number of live keys never exceeds the capacity after an
//!   inserting operation;
//! - an aggregate emptied by an operation is unbound along with its key;
//! - a binding's variant never changes, except through the unconditional
//!   string `set`.
//!
//! ## Locking
//!
//! Mutations take the write lock. Pure inspections take the read lock
//! and do not refresh recency, so eviction order is approximate under
//! read-heavy workloads. The one deliberate exception is
//! [`StorageEngine::get`]: a string read counts as a touch, which keeps
//! hot strings resident, so it takes the write lock too.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               StorageEngine                  │
//! │  ┌────────────────────────────────────────┐  │
//! │  │            RwLock<Keyspace>            │  │
//! │  │  map: key → Value                      │  │
//! │  │  recency: newest … coldest             │  │
//! │  │  filter: additive bit array            │  │
//! │  └────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Operations are linearizable: each takes effect at one point between
//! lock acquisition and release. The engine never blocks on anything but
//! the lock; persistence I/O happens only at process start and shutdown.

use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use thiserror::Error;
use tracing::debug;

use super::bloom::BloomFilter;
use super::persist;
use super::recency::RecencyList;
use super::value::{resolve_index, resolve_range, Value, ValueKind};

/// Default maximum number of live keys.
pub const DEFAULT_CAPACITY: usize = 1000;

/// An operation was applied to a key bound to a different variant.
///
/// Signalled by value, never by unwinding; the dispatcher maps it to the
/// protocol error reply.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
pub struct WrongType;

/// The state guarded by the engine's lock.
#[derive(Debug, Default)]
struct Keyspace {
    map: HashMap<Bytes, Value>,
    recency: RecencyList,
    filter: BloomFilter,
}

impl Keyspace {
    /// Filter-gated lookup. A negative probe answers "absent" without
    /// touching the map.
    fn lookup(&self, key: &Bytes) -> Option<&Value> {
        if !self.filter.probe(key) {
            return None;
        }
        self.map.get(key)
    }

    fn lookup_mut(&mut self, key: &Bytes) -> Option<&mut Value> {
        if !self.filter.probe(key) {
            return None;
        }
        self.map.get_mut(key)
    }

    /// Binds `key` to `value`, replacing any prior binding, and records
    /// the key as newest.
    fn bind(&mut self, key: &Bytes, value: Value) {
        self.map.insert(key.clone(), value);
        self.recency.touch(key);
        self.filter.add(key);
    }

    /// Removes `key` from map and recency. Filter bits stay set.
    fn unbind(&mut self, key: &Bytes) -> bool {
        let was_bound = self.map.remove(key).is_some();
        self.recency.forget(key);
        was_bound
    }

    /// Get-or-create for list writes: a missing key is bound to an empty
    /// list; a key of another variant is a type mismatch and nothing is
    /// inserted.
    fn list_entry(&mut self, key: &Bytes) -> Result<&mut VecDeque<Bytes>, WrongType> {
        let filter = &mut self.filter;
        let value = self.map.entry(key.clone()).or_insert_with(|| {
            filter.add(key);
            Value::List(VecDeque::new())
        });
        match value {
            Value::List(items) => Ok(items),
            _ => Err(WrongType),
        }
    }

    fn set_entry(&mut self, key: &Bytes) -> Result<&mut HashSet<Bytes>, WrongType> {
        let filter = &mut self.filter;
        let value = self.map.entry(key.clone()).or_insert_with(|| {
            filter.add(key);
            Value::Set(HashSet::new())
        });
        match value {
            Value::Set(members) => Ok(members),
            _ => Err(WrongType),
        }
    }

    fn hash_entry(&mut self, key: &Bytes) -> Result<&mut HashMap<Bytes, Bytes>, WrongType> {
        let filter = &mut self.filter;
        let value = self.map.entry(key.clone()).or_insert_with(|| {
            filter.add(key);
            Value::Hash(HashMap::new())
        });
        match value {
            Value::Hash(fields) => Ok(fields),
            _ => Err(WrongType),
        }
    }

    /// Unbinds `key` if it holds an aggregate that has become empty.
    fn drop_if_empty(&mut self, key: &Bytes) {
        if self.map.get(key).is_some_and(Value::is_empty_aggregate) {
            self.unbind(key);
        }
    }

    /// Ejects coldest keys until at most `capacity` remain.
    ///
    /// # Returns
    ///
    /// The number of keys ejected.
    fn evict_to(&mut self, capacity: usize) -> usize {
        let mut evicted = 0;
        while self.recency.len() > capacity {
            let Some(coldest) = self.recency.oldest().cloned() else {
                break;
            };
            self.map.remove(&coldest);
            self.recency.forget(&coldest);
            evicted += 1;
            debug!(key = %String::from_utf8_lossy(&coldest), "evicted coldest key");
        }
        evicted
    }
}

/// Engine statistics.
#[derive(Debug, Clone, Copy)]
pub struct StorageStats {
    /// Number of live keys.
    pub keys: usize,
    /// Total GET operations served.
    pub get_ops: u64,
    /// Total SET operations served.
    pub set_ops: u64,
    /// Total DEL operations served.
    pub del_ops: u64,
    /// Keys ejected by capacity eviction.
    pub evicted: u64,
}

/// The storage engine shared by all client connections.
///
/// Designed to be wrapped in an `Arc`; every method takes `&self` and is
/// thread-safe through the internal lock.
///
/// # Example
///
/// ```
/// use blinkdb::storage::StorageEngine;
/// use bytes::Bytes;
///
/// let engine = StorageEngine::new();
/// engine.set(&Bytes::from("name"), Bytes::from("alice"));
/// let value = engine.get(&Bytes::from("name")).unwrap();
/// assert_eq!(value, Some(Bytes::from("alice")));
/// ```
#[derive(Debug)]
pub struct StorageEngine {
    inner: RwLock<Keyspace>,
    capacity: usize,
    get_count: AtomicU64,
    set_count: AtomicU64,
    del_count: AtomicU64,
    evicted_count: AtomicU64,
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates an engine with the default capacity of 1000 live keys.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an engine bounding the working set to `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Keyspace::default()),
            capacity,
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            evicted_count: AtomicU64::new(0),
        }
    }

    fn run_eviction(&self, ks: &mut Keyspace) {
        let evicted = ks.evict_to(self.capacity);
        if evicted > 0 {
            self.evicted_count
                .fetch_add(evicted as u64, Ordering::Relaxed);
        }
    }

    // ========================================================================
    // String operations
    // ========================================================================

    /// Binds `key` to a string, unconditionally replacing any prior
    /// binding of any variant.
    pub fn set(&self, key: &Bytes, value: Bytes) {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let mut ks = self.inner.write().unwrap();
        ks.bind(key, Value::String(value));
        self.run_eviction(&mut ks);
    }

    /// Reads a string value.
    ///
    /// A hit refreshes the key's recency, so this takes the write lock.
    ///
    /// # Returns
    ///
    /// `Ok(None)` for an absent key; an empty `Bytes` is a real value,
    /// distinct from absence.
    pub fn get(&self, key: &Bytes) -> Result<Option<Bytes>, WrongType> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let mut ks = self.inner.write().unwrap();
        let value = match ks.lookup(key) {
            None => return Ok(None),
            Some(Value::String(data)) => data.clone(),
            Some(_) => return Err(WrongType),
        };
        ks.recency.touch(key);
        Ok(Some(value))
    }

    /// Removes `key` regardless of its variant.
    ///
    /// # Returns
    ///
    /// `true` if a binding existed.
    pub fn del(&self, key: &Bytes) -> bool {
        self.del_count.fetch_add(1, Ordering::Relaxed);

        let mut ks = self.inner.write().unwrap();
        ks.unbind(key)
    }

    /// The variant bound to `key`, or `None` when absent.
    pub fn key_type(&self, key: &Bytes) -> Option<ValueKind> {
        let ks = self.inner.read().unwrap();
        ks.lookup(key).map(Value::kind)
    }

    // ========================================================================
    // List operations
    // ========================================================================

    /// Prepends an element, creating the list on first touch.
    ///
    /// # Returns
    ///
    /// The list length after the push.
    pub fn push_front(&self, key: &Bytes, element: Bytes) -> Result<usize, WrongType> {
        let mut ks = self.inner.write().unwrap();
        let items = ks.list_entry(key)?;
        items.push_front(element);
        let len = items.len();
        ks.recency.touch(key);
        self.run_eviction(&mut ks);
        Ok(len)
    }

    /// Appends an element, creating the list on first touch.
    pub fn push_back(&self, key: &Bytes, element: Bytes) -> Result<usize, WrongType> {
        let mut ks = self.inner.write().unwrap();
        let items = ks.list_entry(key)?;
        items.push_back(element);
        let len = items.len();
        ks.recency.touch(key);
        self.run_eviction(&mut ks);
        Ok(len)
    }

    /// Removes and returns the head element. A list emptied by the pop
    /// is unbound.
    pub fn pop_front(&self, key: &Bytes) -> Result<Option<Bytes>, WrongType> {
        let mut ks = self.inner.write().unwrap();
        let element = match ks.lookup_mut(key) {
            None => return Ok(None),
            Some(Value::List(items)) => items.pop_front(),
            Some(_) => return Err(WrongType),
        };
        ks.recency.touch(key);
        ks.drop_if_empty(key);
        Ok(element)
    }

    /// Removes and returns the tail element. A list emptied by the pop
    /// is unbound.
    pub fn pop_back(&self, key: &Bytes) -> Result<Option<Bytes>, WrongType> {
        let mut ks = self.inner.write().unwrap();
        let element = match ks.lookup_mut(key) {
            None => return Ok(None),
            Some(Value::List(items)) => items.pop_back(),
            Some(_) => return Err(WrongType),
        };
        ks.recency.touch(key);
        ks.drop_if_empty(key);
        Ok(element)
    }

    /// The element at a signed index; negative counts from the tail.
    /// Out-of-range resolves to `Ok(None)`, not an error.
    pub fn index(&self, key: &Bytes, index: i64) -> Result<Option<Bytes>, WrongType> {
        let ks = self.inner.read().unwrap();
        match ks.lookup(key) {
            None => Ok(None),
            Some(Value::List(items)) => {
                Ok(resolve_index(items.len(), index).and_then(|i| items.get(i).cloned()))
            }
            Some(_) => Err(WrongType),
        }
    }

    /// The list length; 0 for an absent key.
    pub fn list_len(&self, key: &Bytes) -> Result<usize, WrongType> {
        let ks = self.inner.read().unwrap();
        match ks.lookup(key) {
            None => Ok(0),
            Some(Value::List(items)) => Ok(items.len()),
            Some(_) => Err(WrongType),
        }
    }

    /// The inclusive sub-sequence between two signed indices, in list
    /// order. An absent key or an empty selection yields an empty vec.
    pub fn range(&self, key: &Bytes, start: i64, stop: i64) -> Result<Vec<Bytes>, WrongType> {
        let ks = self.inner.read().unwrap();
        match ks.lookup(key) {
            None => Ok(Vec::new()),
            Some(Value::List(items)) => match resolve_range(items.len(), start, stop) {
                None => Ok(Vec::new()),
                Some((from, to)) => Ok(items
                    .iter()
                    .skip(from)
                    .take(to - from + 1)
                    .cloned()
                    .collect()),
            },
            Some(_) => Err(WrongType),
        }
    }

    // ========================================================================
    // Set operations
    // ========================================================================

    /// Adds a member, creating the set on first touch.
    ///
    /// # Returns
    ///
    /// `true` if the member was newly inserted.
    pub fn sadd(&self, key: &Bytes, member: Bytes) -> Result<bool, WrongType> {
        let mut ks = self.inner.write().unwrap();
        let members = ks.set_entry(key)?;
        let added = members.insert(member);
        ks.recency.touch(key);
        self.run_eviction(&mut ks);
        Ok(added)
    }

    /// Membership test; `false` for an absent key.
    pub fn sismember(&self, key: &Bytes, member: &Bytes) -> Result<bool, WrongType> {
        let ks = self.inner.read().unwrap();
        match ks.lookup(key) {
            None => Ok(false),
            Some(Value::Set(members)) => Ok(members.contains(member)),
            Some(_) => Err(WrongType),
        }
    }

    /// Removes a member. A set emptied by the removal is unbound.
    ///
    /// # Returns
    ///
    /// `true` if the member was present.
    pub fn srem(&self, key: &Bytes, member: &Bytes) -> Result<bool, WrongType> {
        let mut ks = self.inner.write().unwrap();
        let removed = match ks.lookup_mut(key) {
            None => return Ok(false),
            Some(Value::Set(members)) => members.remove(member),
            Some(_) => return Err(WrongType),
        };
        ks.recency.touch(key);
        ks.drop_if_empty(key);
        Ok(removed)
    }

    /// The set cardinality; 0 for an absent key.
    pub fn scard(&self, key: &Bytes) -> Result<usize, WrongType> {
        let ks = self.inner.read().unwrap();
        match ks.lookup(key) {
            None => Ok(0),
            Some(Value::Set(members)) => Ok(members.len()),
            Some(_) => Err(WrongType),
        }
    }

    /// All members, in unspecified order.
    pub fn smembers(&self, key: &Bytes) -> Result<Vec<Bytes>, WrongType> {
        let ks = self.inner.read().unwrap();
        match ks.lookup(key) {
            None => Ok(Vec::new()),
            Some(Value::Set(members)) => Ok(members.iter().cloned().collect()),
            Some(_) => Err(WrongType),
        }
    }

    // ========================================================================
    // Hash operations
    // ========================================================================

    /// Sets a field, creating the hash on first touch.
    ///
    /// # Returns
    ///
    /// `true` if the field was newly added (re-setting an existing field
    /// returns `false`, even with an identical value).
    pub fn hset(&self, key: &Bytes, field: Bytes, value: Bytes) -> Result<bool, WrongType> {
        let mut ks = self.inner.write().unwrap();
        let fields = ks.hash_entry(key)?;
        let added = fields.insert(field, value).is_none();
        ks.recency.touch(key);
        self.run_eviction(&mut ks);
        Ok(added)
    }

    /// Reads a field; `Ok(None)` when the key or the field is absent.
    pub fn hget(&self, key: &Bytes, field: &Bytes) -> Result<Option<Bytes>, WrongType> {
        let ks = self.inner.read().unwrap();
        match ks.lookup(key) {
            None => Ok(None),
            Some(Value::Hash(fields)) => Ok(fields.get(field).cloned()),
            Some(_) => Err(WrongType),
        }
    }

    /// Field existence test; `false` for an absent key.
    pub fn hexists(&self, key: &Bytes, field: &Bytes) -> Result<bool, WrongType> {
        let ks = self.inner.read().unwrap();
        match ks.lookup(key) {
            None => Ok(false),
            Some(Value::Hash(fields)) => Ok(fields.contains_key(field)),
            Some(_) => Err(WrongType),
        }
    }

    /// Deletes a field. A hash emptied by the deletion is unbound.
    ///
    /// # Returns
    ///
    /// `true` if the field was present.
    pub fn hdel(&self, key: &Bytes, field: &Bytes) -> Result<bool, WrongType> {
        let mut ks = self.inner.write().unwrap();
        let removed = match ks.lookup_mut(key) {
            None => return Ok(false),
            Some(Value::Hash(fields)) => fields.remove(field).is_some(),
            Some(_) => return Err(WrongType),
        };
        ks.recency.touch(key);
        ks.drop_if_empty(key);
        Ok(removed)
    }

    /// The field count; 0 for an absent key.
    pub fn hlen(&self, key: &Bytes) -> Result<usize, WrongType> {
        let ks = self.inner.read().unwrap();
        match ks.lookup(key) {
            None => Ok(0),
            Some(Value::Hash(fields)) => Ok(fields.len()),
            Some(_) => Err(WrongType),
        }
    }

    /// All field names, in unspecified order.
    pub fn hkeys(&self, key: &Bytes) -> Result<Vec<Bytes>, WrongType> {
        let ks = self.inner.read().unwrap();
        match ks.lookup(key) {
            None => Ok(Vec::new()),
            Some(Value::Hash(fields)) => Ok(fields.keys().cloned().collect()),
            Some(_) => Err(WrongType),
        }
    }

    /// All field values, in unspecified order.
    pub fn hvals(&self, key: &Bytes) -> Result<Vec<Bytes>, WrongType> {
        let ks = self.inner.read().unwrap();
        match ks.lookup(key) {
            None => Ok(Vec::new()),
            Some(Value::Hash(fields)) => Ok(fields.values().cloned().collect()),
            Some(_) => Err(WrongType),
        }
    }

    /// All entries as (field, value) pairs, in unspecified order but
    /// stable across a single enumeration.
    pub fn hentries(&self, key: &Bytes) -> Result<Vec<(Bytes, Bytes)>, WrongType> {
        let ks = self.inner.read().unwrap();
        match ks.lookup(key) {
            None => Ok(Vec::new()),
            Some(Value::Hash(fields)) => {
                Ok(fields.iter().map(|(f, v)| (f.clone(), v.clone())).collect())
            }
            Some(_) => Err(WrongType),
        }
    }

    // ========================================================================
    // Introspection and persistence
    // ========================================================================

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Operation counters and current key count.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.len(),
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            evicted: self.evicted_count.load(Ordering::Relaxed),
        }
    }

    /// Loads a snapshot file, touching keys in file order so the last
    /// line is the newest. Unparseable lines are skipped.
    ///
    /// # Returns
    ///
    /// The number of keys loaded.
    pub fn load_file(&self, path: impl AsRef<Path>) -> io::Result<usize> {
        let file = File::open(path)?;
        let entries = persist::read_snapshot(BufReader::new(file))?;

        let mut ks = self.inner.write().unwrap();
        let mut loaded = 0;
        for (key, value) in entries {
            if value.is_empty_aggregate() {
                continue;
            }
            ks.bind(&key, value);
            loaded += 1;
        }
        self.run_eviction(&mut ks);
        Ok(loaded)
    }

    /// Overwrites the snapshot file with every live key.
    ///
    /// # Returns
    ///
    /// The number of keys written.
    pub fn save_file(&self, path: impl AsRef<Path>) -> io::Result<usize> {
        let ks = self.inner.read().unwrap();
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        persist::write_snapshot(&mut writer, ks.map.iter())
    }
}
