//! Wire Protocol
//!
//! The line-delimited command protocol: requests are whitespace-separated
//! tokens terminated by CRLF, replies follow the tagged-byte RESP
//! convention (`+`, `-`, `:`, `$`, `*`).
//!
//! ## Modules
//!
//! - `parser`: incremental framing and tokenization of inline requests
//! - `types`: the [`Reply`] enum and its wire serialization
//!
//! ## Example
//!
//! ```
//! use blinkdb::protocol::{next_request, Reply};
//!
//! let (tokens, consumed) = next_request(b"PING\r\n").unwrap();
//! assert_eq!(tokens[0].as_ref(), b"PING");
//! assert_eq!(consumed, 6);
//!
//! assert_eq!(Reply::pong().serialize(), b"+PONG\r\n");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used items for convenience
pub use parser::next_request;
pub use types::{Reply, CRLF};
