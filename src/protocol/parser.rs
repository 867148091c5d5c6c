//! Inline Request Framing
//!
//! Requests arrive as whitespace-separated tokens on a CRLF-terminated
//! line; there is no binary-safe framing on the request side. The parser
//! is incremental: the caller appends network data to a buffer and asks
//! for the next complete request.
//!
//! The parser returns either:
//! - `Some((tokens, consumed))` when a full line is buffered; `consumed`
//!   bytes are then discarded by the caller. An empty or all-whitespace
//!   line yields an empty token list, which the caller ignores.
//! - `None` when no complete line has arrived yet.
//!
//! Tokenization cannot fail, so malformed input is a dispatch concern
//! (an unknown command name), never a connection-fatal parse error.

use bytes::Bytes;

/// Extracts the next CRLF-terminated request from `buf`.
///
/// # Returns
///
/// The line's tokens and the number of bytes consumed (terminator
/// included), or `None` when more data is needed.
pub fn next_request(buf: &[u8]) -> Option<(Vec<Bytes>, usize)> {
    let line_end = find_crlf(buf)?;
    Some((tokenize(&buf[..line_end]), line_end + 2))
}

/// Splits a line into whitespace-separated tokens.
fn tokenize(line: &[u8]) -> Vec<Bytes> {
    line.split(|b| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty())
        .map(Bytes::copy_from_slice)
        .collect()
}

/// Position of the first `\r\n` in the buffer, if any.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|pair| pair == b"\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(strs: &[&str]) -> Vec<Bytes> {
        strs.iter().map(|s| Bytes::from(s.to_string())).collect()
    }

    #[test]
    fn test_complete_line() {
        let (parsed, consumed) = next_request(b"SET greet hello\r\n").unwrap();
        assert_eq!(parsed, tokens(&["SET", "greet", "hello"]));
        assert_eq!(consumed, 17);
    }

    #[test]
    fn test_incomplete_line_needs_more_data() {
        assert!(next_request(b"SET greet hel").is_none());
        assert!(next_request(b"SET greet hello\r").is_none());
        assert!(next_request(b"").is_none());
    }

    #[test]
    fn test_consumes_only_the_first_line() {
        let buf = b"PING\r\nGET k\r\n";
        let (parsed, consumed) = next_request(buf).unwrap();
        assert_eq!(parsed, tokens(&["PING"]));
        assert_eq!(consumed, 6);

        let (parsed, consumed) = next_request(&buf[consumed..]).unwrap();
        assert_eq!(parsed, tokens(&["GET", "k"]));
        assert_eq!(consumed, 7);
    }

    #[test]
    fn test_empty_line_yields_no_tokens() {
        let (parsed, consumed) = next_request(b"\r\n").unwrap();
        assert!(parsed.is_empty());
        assert_eq!(consumed, 2);

        let (parsed, _) = next_request(b"   \r\n").unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_repeated_whitespace_collapses() {
        let (parsed, _) = next_request(b"  SET \t greet   hello \r\n").unwrap();
        assert_eq!(parsed, tokens(&["SET", "greet", "hello"]));
    }

    #[test]
    fn test_tokens_are_raw_bytes() {
        let (parsed, _) = next_request(b"SET k \x80\x81\r\n").unwrap();
        assert_eq!(parsed[2].as_ref(), b"\x80\x81");
    }
}
