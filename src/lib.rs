//! # BlinkDB - An In-Memory Key-Value Store with Typed Values
//!
//! BlinkDB is a single-process, in-memory key-value database. Keys live
//! in one flat keyspace and bind to one of four value kinds: byte
//! string, list, set, or hash. Clients speak a line-delimited command
//! protocol (whitespace-separated tokens in, RESP-shaped replies out).
//!
//! ## Features
//!
//! - **Typed values**: String, List, Set, and Hash with type-checked
//!   command semantics
//! - **Bounded working set**: usage-ordered (LRU) eviction with a
//!   configurable capacity
//! - **Fast negative lookups**: an additive bloom filter answers
//!   "definitely absent" without touching the map
//! - **Snapshot persistence**: the keyspace is loaded on start and
//!   written back on clean shutdown
//! - **Async I/O**: built on Tokio, one task per client over a shared
//!   engine
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                           BlinkDB                              │
//! │                                                                │
//! │  ┌────────────┐   ┌─────────────┐   ┌────────────────┐        │
//! │  │ TCP server │──>│ Connection  │──>│ CommandHandler │        │
//! │  │ (main.rs)  │   │  handler    │   └───────┬────────┘        │
//! │  └────────────┘   └─────────────┘           │                 │
//! │                                             ▼                 │
//! │  ┌──────────────────────────────────────────────────────────┐ │
//! │  │                      StorageEngine                       │ │
//! │  │        RwLock { map, recency list, bloom filter }        │ │
//! │  └───────────────┬──────────────────────────▲───────────────┘ │
//! │                  │ save (shutdown)          │ load (startup)  │
//! │                  ▼                          │                 │
//! │               blinkdb_data.txt  ────────────┘                 │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use blinkdb::commands::CommandHandler;
//! use blinkdb::connection::{handle_connection, ConnectionStats};
//! use blinkdb::storage::StorageEngine;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = Arc::new(StorageEngine::new());
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:9001").await.unwrap();
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         let handler = CommandHandler::new(Arc::clone(&storage));
//!         tokio::spawn(handle_connection(stream, addr, handler, Arc::clone(&stats)));
//!     }
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - Strings: `SET`, `GET`, `DEL`, `TYPE`
//! - Lists: `LPUSH`, `RPUSH`, `LPOP`, `RPOP`, `LINDEX`, `LLEN`, `LRANGE`
//! - Sets: `SADD`, `SISMEMBER`, `SREM`, `SCARD`, `SMEMBERS`
//! - Hashes: `HSET`, `HGET`, `HEXISTS`, `HDEL`, `HLEN`, `HKEYS`,
//!   `HVALS`, `HGETALL`
//! - Server: `PING`
//!
//! ## Module Overview
//!
//! - [`protocol`]: request framing and the reply grammar
//! - [`storage`]: the typed keyspace with eviction, filter, and snapshots
//! - [`commands`]: the dispatch table mapping requests to engine calls
//! - [`connection`]: per-client connection handling

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{next_request, Reply};
pub use storage::{StorageEngine, ValueKind, WrongType};

/// The default port BlinkDB listens on
pub const DEFAULT_PORT: u16 = 9001;

/// The default host BlinkDB binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of BlinkDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
