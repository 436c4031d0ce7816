//! Client facade: key qualification, server selection, and framed operations.

use std::collections::HashMap;
use std::time::Duration;

use ahash::AHashMap;
use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use crate::codec::{RawCodec, ValueCodec};
use crate::config::{ClientConfig, ServerSpec};
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::hash::hash_key;
use crate::protocol;
use crate::ring::BucketRing;
use crate::server::ServerEndpoint;

/// Selection attempts before a key is declared unroutable.
const MAX_SELECTION_TRIES: u32 = 20;

/// Single-owner cache client.
///
/// Operations take `&mut self`; the caller guarantees exclusive use. For a
/// pool shared across threads, wrap it in a
/// [`SharedClient`](crate::SharedClient).
#[derive(Debug)]
pub struct Client<C: ValueCodec = RawCodec> {
    codec: C,
    namespace: Option<String>,
    readonly: bool,
    request_timeout: Duration,
    servers: Vec<ServerEndpoint>,
    ring: BucketRing,
}

impl Client<RawCodec> {
    /// Build a client storing raw [`Bytes`] values.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_codec(config, RawCodec)
    }
}

impl<C: ValueCodec> Client<C> {
    /// Build a client with a caller-supplied value codec.
    pub fn with_codec(config: ClientConfig, codec: C) -> Result<Self> {
        if let Some(ns) = &config.namespace {
            if ns.is_empty() {
                return Err(Error::Usage("namespace must be non-empty".into()));
            }
        }
        let specs = config
            .servers
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<ServerSpec>>>()?;
        let mut client = Self {
            codec,
            namespace: config.namespace,
            readonly: config.readonly,
            request_timeout: config.request_timeout,
            servers: Vec::new(),
            ring: BucketRing::build(&[]),
        };
        client.set_servers(specs);
        Ok(client)
    }

    /// Replace the server roster. Existing connections are dropped and the
    /// bucket ring is rebuilt and swapped in one step.
    pub fn set_servers(&mut self, specs: Vec<ServerSpec>) {
        let servers: Vec<ServerEndpoint> = specs
            .into_iter()
            .map(|spec| ServerEndpoint::new(spec, self.request_timeout))
            .collect();
        debug!(count = servers.len(), "replacing server roster");
        self.ring = BucketRing::build(&servers);
        self.servers = servers;
    }

    /// Parse-and-replace convenience over [`set_servers`](Self::set_servers).
    pub fn set_server_strs<S: AsRef<str>>(&mut self, servers: &[S]) -> Result<()> {
        let specs = servers
            .iter()
            .map(|s| s.as_ref().parse())
            .collect::<Result<Vec<ServerSpec>>>()?;
        self.set_servers(specs);
        Ok(())
    }

    /// Endpoint states, for monitoring.
    pub fn servers(&self) -> impl Iterator<Item = &ServerEndpoint> {
        self.servers.iter()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Fetch one key. `Ok(None)` is a miss.
    pub fn get(&mut self, key: &str) -> Result<Option<C::Value>> {
        let qkey = self.qualify(key);
        match self.fetch_one(&qkey)? {
            Some(raw) => Ok(Some(self.codec.decode(&raw)?)),
            None => Ok(None),
        }
    }

    /// Fetch many keys with one request per owning server.
    ///
    /// Missing keys are absent from the result. No ordering is guaranteed,
    /// across servers or within one.
    pub fn get_multi<K: AsRef<str>>(&mut self, keys: &[K]) -> Result<HashMap<String, C::Value>> {
        self.check_ready()?;

        // Group qualified keys by owning server, remembering the caller's
        // spelling for the result map.
        let mut groups: AHashMap<usize, Vec<String>> = AHashMap::new();
        let mut originals: AHashMap<String, String> = AHashMap::new();
        for key in keys {
            let key = key.as_ref();
            let qkey = self.qualify(key);
            if originals.contains_key(&qkey) {
                continue;
            }
            let idx = self.select_server(&qkey)?;
            originals.insert(qkey.clone(), key.to_string());
            groups.entry(idx).or_default().push(qkey);
        }

        let mut raw: AHashMap<String, Bytes> = AHashMap::new();
        for (idx, qkeys) in groups {
            self.on_server(idx, |conn| {
                let mut buf = BytesMut::new();
                protocol::encode_get_multi(&mut buf, &qkeys);
                conn.write_all(&buf)?;
                loop {
                    let line = conn.read_line()?;
                    let Some(header) = protocol::parse_value_line(&line)? else {
                        return Ok(());
                    };
                    let data = read_data_block(conn, header.len)?;
                    raw.insert(header.key, data);
                }
            })?;
        }

        let mut result = HashMap::with_capacity(raw.len());
        for (qkey, data) in raw {
            // Keys the server volunteered but we never asked for are dropped.
            let Some(key) = originals.remove(&qkey) else {
                continue;
            };
            result.insert(key, self.codec.decode(&data)?);
        }
        Ok(result)
    }

    /// Store a value unconditionally.
    ///
    /// The server's status line is read to keep the stream in frame but not
    /// interpreted.
    pub fn set(&mut self, key: &str, value: &C::Value, expiry: u32) -> Result<()> {
        self.check_ready()?;
        self.check_writable()?;
        let data = self.codec.encode(value)?;
        let qkey = self.qualify(key);
        let idx = self.select_server(&qkey)?;
        self.on_server(idx, |conn| {
            let mut buf = BytesMut::with_capacity(data.len() + 64);
            protocol::encode_store(&mut buf, "set", &qkey, expiry, &data);
            conn.write_all(&buf)?;
            conn.read_line()?;
            Ok(())
        })
    }

    /// Store a value only if the key is absent. Returns whether the server
    /// answered `STORED`.
    pub fn add(&mut self, key: &str, value: &C::Value, expiry: u32) -> Result<bool> {
        self.check_ready()?;
        self.check_writable()?;
        let data = self.codec.encode(value)?;
        let qkey = self.qualify(key);
        let idx = self.select_server(&qkey)?;
        self.on_server(idx, |conn| {
            let mut buf = BytesMut::with_capacity(data.len() + 64);
            protocol::encode_store(&mut buf, "add", &qkey, expiry, &data);
            conn.write_all(&buf)?;
            let line = conn.read_line()?;
            Ok(line == protocol::STORED_LINE)
        })
    }

    /// Delete a key, optionally blocking re-adds for `delay` seconds. The
    /// status line is read and discarded.
    pub fn delete(&mut self, key: &str, delay: u32) -> Result<()> {
        self.check_ready()?;
        self.check_writable()?;
        let qkey = self.qualify(key);
        let idx = self.select_server(&qkey)?;
        self.on_server(idx, |conn| {
            let mut buf = BytesMut::new();
            protocol::encode_delete(&mut buf, &qkey, delay);
            conn.write_all(&buf)?;
            conn.read_line()?;
            Ok(())
        })
    }

    /// Collect `stats` from every reachable server, keyed by `"host:port"`.
    /// Values stay strings; the caller picks the numeric parsing. Servers in
    /// their dead cooldown are skipped.
    pub fn stats(&mut self) -> Result<HashMap<String, HashMap<String, String>>> {
        self.check_ready()?;
        let mut result = HashMap::new();
        for idx in 0..self.servers.len() {
            let name = self.servers[idx].name();
            if self.servers[idx].ensure_open().is_none() {
                debug!(server = %name, "skipping unreachable server for stats");
                continue;
            }
            let server_stats = self.on_server(idx, |conn| {
                let mut buf = BytesMut::new();
                protocol::encode_stats(&mut buf);
                conn.write_all(&buf)?;
                let mut stats = HashMap::new();
                loop {
                    let line = conn.read_line()?;
                    let Some((stat, value)) = protocol::parse_stat_line(&line)? else {
                        return Ok(stats);
                    };
                    stats.insert(stat, value);
                }
            })?;
            result.insert(name, server_stats);
        }
        Ok(result)
    }

    /// Drop every connection without marking servers dead; the next
    /// operation reconnects immediately.
    pub fn reset(&mut self) {
        for server in &mut self.servers {
            server.close();
        }
    }

    fn check_ready(&self) -> Result<()> {
        if self.servers.is_empty() {
            return Err(Error::NoActiveServers);
        }
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(Error::ReadOnly);
        }
        Ok(())
    }

    fn qualify(&self, key: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}:{key}"),
            None => key.to_string(),
        }
    }

    /// Pick the server owning `qkey`.
    ///
    /// The hash is perturbed and retried when the selected server cannot be
    /// opened, so keys route around dead servers without remapping the rest
    /// of the space. A single-server pool skips hashing entirely.
    fn select_server(&mut self, qkey: &str) -> Result<usize> {
        self.check_ready()?;
        if self.servers.len() == 1 {
            return Ok(0);
        }
        let mut h = hash_key(qkey.as_bytes());
        for attempt in 0..MAX_SELECTION_TRIES {
            let idx = self.ring.bucket(h);
            if self.servers[idx].ensure_open().is_some() {
                return Ok(idx);
            }
            trace!(key = qkey, attempt, "selected server unavailable, rehashing");
            h += hash_key(format!("{attempt}{qkey}").as_bytes());
        }
        Err(Error::NoServersAvailable)
    }

    /// Fetch the raw payload for one qualified key.
    fn fetch_one(&mut self, qkey: &str) -> Result<Option<Bytes>> {
        let idx = self.select_server(qkey)?;
        self.on_server(idx, |conn| {
            let mut buf = BytesMut::new();
            protocol::encode_get(&mut buf, qkey);
            conn.write_all(&buf)?;
            let line = conn.read_line()?;
            let Some(header) = protocol::parse_value_line(&line)? else {
                return Ok(None);
            };
            let data = read_data_block(conn, header.len)?;
            let end = conn.read_line()?;
            if end != protocol::END_LINE {
                return Err(Error::Protocol(format!(
                    "expected END after value, got {:?}",
                    String::from_utf8_lossy(&end)
                )));
            }
            Ok(Some(data))
        })
    }

    /// Run `op` on the chosen server's socket. Any failure closes the socket
    /// (without marking the server dead) so the next operation reconnects
    /// from a known state.
    fn on_server<T>(
        &mut self,
        idx: usize,
        op: impl FnOnce(&mut Connection) -> Result<T>,
    ) -> Result<T> {
        let server = &mut self.servers[idx];
        let name = server.name();
        let Some(conn) = server.ensure_open() else {
            return Err(Error::NoConnection(name));
        };
        let result = op(conn);
        if result.is_err() {
            server.close();
        }
        result
    }
}

/// Read an exact-length data block and its trailing CRLF.
fn read_data_block(conn: &mut Connection, len: usize) -> Result<Bytes> {
    let mut data = vec![0u8; len];
    conn.read_exact(&mut data)?;
    let mut crlf = [0u8; 2];
    conn.read_exact(&mut crlf)?;
    if &crlf != b"\r\n" {
        return Err(Error::Protocol("value data not terminated by CRLF".into()));
    }
    Ok(Bytes::from(data))
}
