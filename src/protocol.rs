//! Memcache ASCII wire framing.
//!
//! Requests are single CRLF-terminated lines; storage commands carry a data
//! block of an exact, pre-announced byte length. Responses are parsed line
//! by line. Flags are always written as zero: the value envelope is opaque
//! bytes and carries no client-side metadata.

use bytes::BytesMut;

use crate::error::{Error, Result};

pub(crate) const END_LINE: &[u8] = b"END";
pub(crate) const STORED_LINE: &[u8] = b"STORED";

/// Encode `get <key>\r\n`.
pub(crate) fn encode_get(buf: &mut BytesMut, key: &str) {
    buf.extend_from_slice(b"get ");
    buf.extend_from_slice(key.as_bytes());
    buf.extend_from_slice(b"\r\n");
}

/// Encode `get <k1> <k2> ...\r\n`.
pub(crate) fn encode_get_multi(buf: &mut BytesMut, keys: &[String]) {
    buf.extend_from_slice(b"get");
    for key in keys {
        buf.extend_from_slice(b" ");
        buf.extend_from_slice(key.as_bytes());
    }
    buf.extend_from_slice(b"\r\n");
}

/// Encode a storage command: `<verb> <key> 0 <expiry> <len>\r\n<data>\r\n`.
pub(crate) fn encode_store(buf: &mut BytesMut, verb: &str, key: &str, expiry: u32, data: &[u8]) {
    buf.extend_from_slice(verb.as_bytes());
    buf.extend_from_slice(b" ");
    buf.extend_from_slice(key.as_bytes());
    buf.extend_from_slice(format!(" 0 {expiry} {}\r\n", data.len()).as_bytes());
    buf.extend_from_slice(data);
    buf.extend_from_slice(b"\r\n");
}

/// Encode `delete <key> <delay>\r\n`.
pub(crate) fn encode_delete(buf: &mut BytesMut, key: &str, delay: u32) {
    buf.extend_from_slice(b"delete ");
    buf.extend_from_slice(key.as_bytes());
    buf.extend_from_slice(format!(" {delay}\r\n").as_bytes());
}

/// Encode `stats\r\n`.
pub(crate) fn encode_stats(buf: &mut BytesMut) {
    buf.extend_from_slice(b"stats\r\n");
}

/// A parsed `VALUE <key> <flags> <bytes>` header.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ValueHeader {
    pub key: String,
    pub len: usize,
}

/// Parse one retrieval response line: `END` yields `None`, a `VALUE` header
/// yields `Some`. Anything else is a protocol error.
pub(crate) fn parse_value_line(line: &[u8]) -> Result<Option<ValueHeader>> {
    if line == END_LINE {
        return Ok(None);
    }
    let text = line_str(line)?;
    let mut parts = text.split(' ');
    if parts.next() != Some("VALUE") {
        return Err(unexpected_line(text));
    }
    let key = parts.next().filter(|k| !k.is_empty());
    let flags = parts.next();
    let len = parts.next().and_then(|n| n.parse::<usize>().ok());
    let (Some(key), Some(_flags), Some(len)) = (key, flags, len) else {
        return Err(unexpected_line(text));
    };
    if parts.next().is_some() {
        return Err(unexpected_line(text));
    }
    Ok(Some(ValueHeader {
        key: key.to_string(),
        len,
    }))
}

/// Parse one `stats` response line: `END` yields `None`, `STAT <name> <value>`
/// yields the pair. Names are `[A-Za-z0-9_]+`, values `[0-9.]+`.
pub(crate) fn parse_stat_line(line: &[u8]) -> Result<Option<(String, String)>> {
    if line == END_LINE {
        return Ok(None);
    }
    let text = line_str(line)?;
    let mut parts = text.split(' ');
    if parts.next() != Some("STAT") {
        return Err(unexpected_line(text));
    }
    let name = parts
        .next()
        .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_'));
    let value = parts
        .next()
        .filter(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit() || b == b'.'));
    let (Some(name), Some(value)) = (name, value) else {
        return Err(unexpected_line(text));
    };
    if parts.next().is_some() {
        return Err(unexpected_line(text));
    }
    Ok(Some((name.to_string(), value.to_string())))
}

fn line_str(line: &[u8]) -> Result<&str> {
    std::str::from_utf8(line).map_err(|_| Error::Protocol("non-ASCII response line".into()))
}

fn unexpected_line(line: &str) -> Error {
    Error::Protocol(format!("unexpected response line: {line:?}"))
}
