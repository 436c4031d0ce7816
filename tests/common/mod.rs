//! Test servers for end-to-end tests.
//!
//! [`MiniServer`] is a miniature in-memory cache speaking just enough of the
//! ASCII protocol for the client's operations, and it records every raw
//! request frame so tests can assert exact wire bytes. The other helpers
//! build failure modes: an address that refuses connects and a server that
//! accepts but never replies.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

type Store = Arc<Mutex<HashMap<String, Vec<u8>>>>;
type RequestLog = Arc<Mutex<Vec<Vec<u8>>>>;

pub struct MiniServer {
    pub addr: SocketAddr,
    log: RequestLog,
}

impl MiniServer {
    /// Spawn a server thread accepting any number of connections, serving
    /// get/set/add/delete/stats from a shared in-memory table.
    pub fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let log: RequestLog = Arc::default();
        let store: Store = Arc::default();

        let accept_log = log.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let log = accept_log.clone();
                let store = store.clone();
                thread::spawn(move || serve(stream, store, log));
            }
        });

        Self { addr, log }
    }

    pub fn addr_str(&self) -> String {
        self.addr.to_string()
    }

    /// Raw request frames received so far, across all connections.
    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.log.lock().unwrap().clone()
    }

    /// How many retrieval requests this server has seen.
    pub fn get_request_count(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.starts_with(b"get "))
            .count()
    }
}

fn serve(stream: TcpStream, store: Store, log: RequestLog) {
    let Ok(read_half) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(read_half);
    let mut writer = stream;

    loop {
        let mut line = Vec::new();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let mut raw = line.clone();
        let text = String::from_utf8_lossy(&line).trim_end().to_string();
        let parts: Vec<&str> = text.split(' ').collect();

        let reply: Vec<u8> = match parts[0] {
            "get" => {
                let mut reply = Vec::new();
                let store = store.lock().unwrap();
                for key in &parts[1..] {
                    if let Some(data) = store.get(*key) {
                        reply.extend_from_slice(
                            format!("VALUE {key} 0 {}\r\n", data.len()).as_bytes(),
                        );
                        reply.extend_from_slice(data);
                        reply.extend_from_slice(b"\r\n");
                    }
                }
                reply.extend_from_slice(b"END\r\n");
                reply
            }
            "set" | "add" => {
                let key = parts[1].to_string();
                let len: usize = parts[4].parse().unwrap();
                let mut data = vec![0u8; len + 2];
                if reader.read_exact(&mut data).is_err() {
                    return;
                }
                raw.extend_from_slice(&data);
                data.truncate(len);
                let mut store = store.lock().unwrap();
                if parts[0] == "add" && store.contains_key(&key) {
                    b"NOT_STORED\r\n".to_vec()
                } else {
                    store.insert(key, data);
                    b"STORED\r\n".to_vec()
                }
            }
            "delete" => {
                if store.lock().unwrap().remove(parts[1]).is_some() {
                    b"DELETED\r\n".to_vec()
                } else {
                    b"NOT_FOUND\r\n".to_vec()
                }
            }
            "stats" => {
                let items = store.lock().unwrap().len();
                format!("STAT curr_items {items}\r\nSTAT uptime 42\r\nEND\r\n").into_bytes()
            }
            _ => b"ERROR\r\n".to_vec(),
        };

        log.lock().unwrap().push(raw);
        if writer.write_all(&reply).is_err() {
            return;
        }
    }
}

/// An address that refuses TCP connects: the listener backing it is gone.
pub fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// A server that accepts connections and never replies, for read-timeout
/// tests.
pub fn silent_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            held.push(stream);
        }
    });
    addr
}

pub fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
