//! Command Processing
//!
//! The dispatch layer between the wire protocol and the storage engine.
//! It receives tokenized requests, validates the command name and arity
//! against a declarative table, executes the matching engine operation,
//! and shapes the result into a [`crate::protocol::Reply`].
//!
//! ```text
//! tokens ──> CommandHandler ──> StorageEngine ──> Reply
//! ```
//!
//! ## Command surface
//!
//! - Strings: `SET`, `GET`, `DEL`, `TYPE`
//! - Lists: `LPUSH`, `RPUSH`, `LPOP`, `RPOP`, `LINDEX`, `LLEN`, `LRANGE`
//! - Sets: `SADD`, `SISMEMBER`, `SREM`, `SCARD`, `SMEMBERS`
//! - Hashes: `HSET`, `HGET`, `HEXISTS`, `HDEL`, `HLEN`, `HKEYS`,
//!   `HVALS`, `HGETALL`
//! - Server: `PING`

pub mod handler;

// Re-export the main command handler
pub use handler::CommandHandler;
