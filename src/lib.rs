//! Blocking client for pools of cache servers speaking the memcached ASCII
//! protocol.
//!
//! Keys are routed to servers through a weight-replicated bucket ring over a
//! CRC32-derived hash, so a key lands on the same server as long as the
//! roster is stable. A server that refuses connects is marked dead for a
//! cooldown window and keys rehash around it; a failure on an established
//! connection closes only that socket and the next call reconnects.
//!
//! Values are opaque bytes. The [`ValueCodec`] seam lets callers plug in
//! their own serialization; [`RawCodec`] stores [`bytes::Bytes`] verbatim.
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use memclient::{Client, ClientConfig};
//!
//! # fn example() -> Result<(), memclient::Error> {
//! let mut client = Client::new(ClientConfig {
//!     servers: vec!["10.0.0.1:11211:2".into(), "10.0.0.2:11211".into()],
//!     namespace: Some("app".into()),
//!     ..Default::default()
//! })?;
//!
//! client.set("greeting", &Bytes::from_static(b"hello"), 0)?;
//! let value = client.get("greeting")?;
//! assert_eq!(value.as_deref(), Some(b"hello".as_ref()));
//! # Ok(())
//! # }
//! ```

mod client;
mod codec;
mod config;
mod connection;
mod error;
mod hash;
mod protocol;
mod ring;
mod server;
mod shared;

pub use client::Client;
pub use codec::{RawCodec, ValueCodec};
pub use config::{ClientConfig, ServerSpec, DEFAULT_PORT};
pub use error::{Error, Result};
pub use hash::hash_key;
pub use server::ServerEndpoint;
pub use shared::SharedClient;
