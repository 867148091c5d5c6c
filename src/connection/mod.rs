//! Connection Management
//!
//! The network front-end: each accepted client gets its own async task
//! that buffers bytes, frames CRLF-terminated request lines, feeds the
//! tokens to the command dispatcher, and writes replies back.
//!
//! ```text
//! TCP listener (main.rs)
//!        │ accept()
//!        ▼
//!   spawned task ──> read bytes ──> frame line ──> execute ──> reply
//! ```
//!
//! The engine itself is synchronous; concurrency comes from one task per
//! client multiplexed by the runtime, all sharing one
//! [`crate::storage::StorageEngine`].

pub mod handler;

// Re-export commonly used types
pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
