//! Command Dispatch
//!
//! Turns a tokenized request into an engine call and shapes the outcome
//! into the reply grammar. Dispatch is table-driven: every command
//! declares its minimum arity in [`COMMAND_TABLE`], and validation
//! happens before any handler runs, so the handlers themselves can index
//! their arguments directly.
//!
//! Error mapping:
//!
//! - unknown command name  -> `-ERR unknown command '<name>'`
//! - arity violation       -> `-ERR wrong number of arguments ...`
//! - non-numeric argument  -> `-ERR value is not an integer or out of range`
//! - engine type mismatch  -> `-WRONGTYPE ...`
//! - absence               -> nil bulk (`$-1`)
//!
//! A failed request terminates only the request; the connection stays
//! usable.

use crate::protocol::Reply;
use crate::storage::{StorageEngine, WrongType};
use bytes::Bytes;
use std::sync::Arc;

/// Every command with its minimum token count, the command name
/// included. Extra tokens are tolerated and ignored.
const COMMAND_TABLE: &[(&str, usize)] = &[
    ("PING", 1),
    ("SET", 3),
    ("GET", 2),
    ("DEL", 2),
    ("TYPE", 2),
    ("LPUSH", 3),
    ("RPUSH", 3),
    ("LPOP", 2),
    ("RPOP", 2),
    ("LINDEX", 3),
    ("LLEN", 2),
    ("LRANGE", 4),
    ("SADD", 3),
    ("SISMEMBER", 3),
    ("SREM", 3),
    ("SCARD", 2),
    ("SMEMBERS", 2),
    ("HSET", 4),
    ("HGET", 3),
    ("HEXISTS", 3),
    ("HDEL", 3),
    ("HLEN", 2),
    ("HKEYS", 2),
    ("HVALS", 2),
    ("HGETALL", 2),
];

fn min_arity(name: &str) -> Option<usize> {
    COMMAND_TABLE
        .iter()
        .find(|(command, _)| *command == name)
        .map(|(_, arity)| *arity)
}

/// Executes commands against a shared storage engine.
///
/// One handler is cloned per connection; all clones dispatch into the
/// same engine.
#[derive(Clone)]
pub struct CommandHandler {
    storage: Arc<StorageEngine>,
}

impl CommandHandler {
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }

    /// Runs one request.
    ///
    /// `tokens` is the whitespace-split request line; the first token is
    /// the case-insensitive command name.
    pub fn execute(&self, tokens: &[Bytes]) -> Reply {
        let Some(first) = tokens.first() else {
            return Reply::error("ERR empty command");
        };

        let name = match std::str::from_utf8(first) {
            Ok(name) => name.to_uppercase(),
            Err(_) => return Reply::unknown_command(&String::from_utf8_lossy(first)),
        };

        let Some(arity) = min_arity(&name) else {
            return Reply::unknown_command(&name.to_lowercase());
        };
        if tokens.len() < arity {
            return Reply::wrong_arity(&name);
        }

        let args = &tokens[1..];
        match name.as_str() {
            "PING" => Reply::pong(),

            // String commands
            "SET" => {
                self.storage.set(&args[0], args[1].clone());
                Reply::ok()
            }
            "GET" => bulk_reply(self.storage.get(&args[0])),
            "DEL" => {
                // unconditional :1, whether or not the key existed
                self.storage.del(&args[0]);
                Reply::Integer(1)
            }
            "TYPE" => match self.storage.key_type(&args[0]) {
                Some(kind) => Reply::simple(kind.name()),
                None => Reply::simple("none"),
            },

            // List commands
            "LPUSH" => count_reply(self.storage.push_front(&args[0], args[1].clone())),
            "RPUSH" => count_reply(self.storage.push_back(&args[0], args[1].clone())),
            "LPOP" => bulk_reply(self.storage.pop_front(&args[0])),
            "RPOP" => bulk_reply(self.storage.pop_back(&args[0])),
            "LINDEX" => match parse_int(&args[1]) {
                Some(index) => bulk_reply(self.storage.index(&args[0], index)),
                None => Reply::not_an_integer(),
            },
            "LLEN" => count_reply(self.storage.list_len(&args[0])),
            "LRANGE" => match (parse_int(&args[1]), parse_int(&args[2])) {
                (Some(start), Some(stop)) => {
                    array_reply(self.storage.range(&args[0], start, stop))
                }
                _ => Reply::not_an_integer(),
            },

            // Set commands
            "SADD" => flag_reply(self.storage.sadd(&args[0], args[1].clone())),
            "SISMEMBER" => flag_reply(self.storage.sismember(&args[0], &args[1])),
            "SREM" => flag_reply(self.storage.srem(&args[0], &args[1])),
            "SCARD" => count_reply(self.storage.scard(&args[0])),
            "SMEMBERS" => array_reply(self.storage.smembers(&args[0])),

            // Hash commands
            "HSET" => flag_reply(self.storage.hset(&args[0], args[1].clone(), args[2].clone())),
            "HGET" => bulk_reply(self.storage.hget(&args[0], &args[1])),
            "HEXISTS" => flag_reply(self.storage.hexists(&args[0], &args[1])),
            "HDEL" => flag_reply(self.storage.hdel(&args[0], &args[1])),
            "HLEN" => count_reply(self.storage.hlen(&args[0])),
            "HKEYS" => array_reply(self.storage.hkeys(&args[0])),
            "HVALS" => array_reply(self.storage.hvals(&args[0])),
            "HGETALL" => match self.storage.hentries(&args[0]) {
                Ok(entries) => Reply::Array(
                    entries
                        .into_iter()
                        .flat_map(|(field, value)| [field, value])
                        .collect(),
                ),
                Err(WrongType) => Reply::wrong_type(),
            },

            // every table entry has a match arm
            _ => Reply::unknown_command(&name.to_lowercase()),
        }
    }
}

fn parse_int(token: &Bytes) -> Option<i64> {
    std::str::from_utf8(token).ok()?.parse().ok()
}

fn bulk_reply(result: Result<Option<Bytes>, WrongType>) -> Reply {
    match result {
        Ok(Some(data)) => Reply::Bulk(data),
        Ok(None) => Reply::Nil,
        Err(WrongType) => Reply::wrong_type(),
    }
}

fn flag_reply(result: Result<bool, WrongType>) -> Reply {
    match result {
        Ok(flag) => Reply::Integer(flag as i64),
        Err(WrongType) => Reply::wrong_type(),
    }
}

fn count_reply(result: Result<usize, WrongType>) -> Reply {
    match result {
        Ok(count) => Reply::Integer(count as i64),
        Err(WrongType) => Reply::wrong_type(),
    }
}

fn array_reply(result: Result<Vec<Bytes>, WrongType>) -> Reply {
    match result {
        Ok(items) => Reply::Array(items),
        Err(WrongType) => Reply::wrong_type(),
    }
}
