//! Reply Grammar
//!
//! The wire format for replies, a subset of the RESP convention. Each
//! reply starts with a type prefix byte and ends with CRLF:
//!
//! - `+` Simple string, e.g. `+OK\r\n`
//! - `-` Error, e.g. `-ERR unknown command 'foo'\r\n`
//! - `:` Integer, e.g. `:1\r\n`
//! - `$` Bulk string, e.g. `$5\r\nhello\r\n`; nil bulk is `$-1\r\n`
//! - `*` Array of bulk strings, e.g. `*1\r\n$1\r\nx\r\n`
//!
//! Requests do not use this grammar; they arrive as whitespace-separated
//! tokens (see [`crate::protocol::parser`]).

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator ending every reply frame.
pub const CRLF: &[u8] = b"\r\n";

/// Reply type prefixes.
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A reply to a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Non-binary status line: `+<text>\r\n`.
    Simple(String),

    /// Error line: `-<text>\r\n`.
    Error(String),

    /// Signed integer: `:<decimal>\r\n`.
    Integer(i64),

    /// Binary-safe payload: `$<len>\r\n<bytes>\r\n`. A zero-length bulk
    /// (`$0\r\n\r\n`) is a real value and is not the same as [`Reply::Nil`].
    Bulk(Bytes),

    /// Genuine absence: `$-1\r\n`.
    Nil,

    /// A counted sequence of bulk strings: `*<count>\r\n` followed by
    /// one bulk per element. The empty array is `*0\r\n`.
    Array(Vec<Bytes>),
}

impl Reply {
    pub fn simple(text: impl Into<String>) -> Self {
        Reply::Simple(text.into())
    }

    pub fn error(text: impl Into<String>) -> Self {
        Reply::Error(text.into())
    }

    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Reply::Bulk(data.into())
    }

    /// `+OK`.
    pub fn ok() -> Self {
        Reply::Simple("OK".to_string())
    }

    /// `+PONG`.
    pub fn pong() -> Self {
        Reply::Simple("PONG".to_string())
    }

    /// The type-mismatch error every typed command maps to.
    pub fn wrong_type() -> Self {
        Reply::Error(
            "WRONGTYPE Operation against a key holding the wrong kind of value".to_string(),
        )
    }

    pub fn unknown_command(name: &str) -> Self {
        Reply::Error(format!("ERR unknown command '{name}'"))
    }

    pub fn wrong_arity(name: &str) -> Self {
        Reply::Error(format!(
            "ERR wrong number of arguments for '{}' command",
            name.to_lowercase()
        ))
    }

    pub fn not_an_integer() -> Self {
        Reply::Error("ERR value is not an integer or out of range".to_string())
    }

    /// Serializes the reply to wire bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the reply into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Reply::Simple(text) => {
                buf.push(prefix::SIMPLE_STRING);
                buf.extend_from_slice(text.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Error(text) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(text.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Integer(n) => {
                buf.push(prefix::INTEGER);
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Bulk(data) => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            Reply::Nil => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
            Reply::Array(items) => {
                buf.push(prefix::ARRAY);
                buf.extend_from_slice(items.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                for item in items {
                    buf.push(prefix::BULK_STRING);
                    buf.extend_from_slice(item.len().to_string().as_bytes());
                    buf.extend_from_slice(CRLF);
                    buf.extend_from_slice(item);
                    buf.extend_from_slice(CRLF);
                }
            }
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Simple(text) => write!(f, "{text}"),
            Reply::Error(text) => write!(f, "(error) {text}"),
            Reply::Integer(n) => write!(f, "(integer) {n}"),
            Reply::Bulk(data) => write!(f, "\"{}\"", String::from_utf8_lossy(data)),
            Reply::Nil => write!(f, "(nil)"),
            Reply::Array(items) => {
                if items.is_empty() {
                    return write!(f, "(empty array)");
                }
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) \"{}\"", i + 1, String::from_utf8_lossy(item))?;
                }
                Ok(())
            }
        }
    }
}
