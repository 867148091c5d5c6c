//! Snapshot Persistence
//!
//! Load-on-start / save-on-shutdown of the keyspace to a line-oriented
//! file. Each line is `{tag} {key} {body}` where the tag is the single
//! byte identifying the variant and the body is the variant's own
//! encoding (see [`crate::storage::value`]). The file is a full
//! snapshot, overwritten on every save (not a log), so durability is
//! limited to clean shutdowns.
//!
//! A line that does not parse is skipped with a warning rather than
//! failing the load.

use bytes::Bytes;
use std::io::{self, BufRead, Write};
use tracing::warn;

use super::value::{Value, ValueKind};

/// Default snapshot path, relative to the working directory.
pub const DEFAULT_DATA_FILE: &str = "blinkdb_data.txt";

/// Writes one snapshot line per entry.
///
/// # Returns
///
/// The number of entries written.
pub fn write_snapshot<'a, W, I>(writer: &mut W, entries: I) -> io::Result<usize>
where
    W: Write,
    I: IntoIterator<Item = (&'a Bytes, &'a Value)>,
{
    let mut written = 0;
    for (key, value) in entries {
        writer.write_all(&[value.kind().tag(), b' '])?;
        writer.write_all(key)?;
        writer.write_all(b" ")?;
        writer.write_all(&value.serialize())?;
        writer.write_all(b"\n")?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Reads every parseable snapshot line, in file order.
pub fn read_snapshot<R: BufRead>(mut reader: R) -> io::Result<Vec<(Bytes, Value)>> {
    let mut entries = Vec::new();
    let mut line = Vec::new();
    let mut lineno = 0usize;

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        lineno += 1;

        if line.last() == Some(&b'\n') {
            line.pop();
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if line.is_empty() {
            continue;
        }

        match parse_line(&line) {
            Some(entry) => entries.push(entry),
            None => warn!(line = lineno, "skipping unparseable snapshot line"),
        }
    }

    Ok(entries)
}

/// Parses one `{tag} {key} {body}` line.
fn parse_line(line: &[u8]) -> Option<(Bytes, Value)> {
    if line.len() < 3 || line[1] != b' ' {
        return None;
    }
    let kind = ValueKind::from_tag(line[0])?;

    let rest = &line[2..];
    let space = rest.iter().position(|&b| b == b' ')?;
    if space == 0 {
        return None;
    }
    let key = Bytes::copy_from_slice(&rest[..space]);
    let value = Value::deserialize(kind, &rest[space + 1..])?;

    Some((key, value))
}
