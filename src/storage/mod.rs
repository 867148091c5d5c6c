//! Storage Module
//!
//! The core of the database: a typed value model, the authoritative
//! keyspace, the keyspace's two sidecars (a recency ordering for
//! eviction and a membership filter for cheap negative lookups), and
//! the snapshot codec that carries the keyspace across restarts.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      StorageEngine                          │
//! │   RwLock ┌──────────────┬──────────────┬────────────────┐   │
//! │          │  key → Value │ RecencyList  │  BloomFilter   │   │
//! │          └──────────────┴──────────────┴────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!              ▲                                   │
//!              │ load_file (startup)               │ save_file (shutdown)
//!              └─────────── blinkdb_data.txt ◄─────┘
//! ```

pub mod bloom;
pub mod engine;
pub mod persist;
pub mod recency;
pub mod value;

// Re-export commonly used types
pub use bloom::{BloomFilter, DEFAULT_FILTER_BITS};
pub use engine::{StorageEngine, StorageStats, WrongType, DEFAULT_CAPACITY};
pub use persist::DEFAULT_DATA_FILE;
pub use recency::RecencyList;
pub use value::{Value, ValueKind};
