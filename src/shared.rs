//! Thread-shared client.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::client::Client;
use crate::codec::{RawCodec, ValueCodec};
use crate::config::ClientConfig;
use crate::error::Result;

/// A [`Client`] behind a client-wide mutex.
///
/// Every operation holds the lock end-to-end — framing, socket I/O, and
/// response parsing — so concurrent callers observe the same total order a
/// single-owner `Client` gives one caller. Clones share the pool.
pub struct SharedClient<C: ValueCodec = RawCodec> {
    inner: Arc<Mutex<Client<C>>>,
}

impl<C: ValueCodec> Clone for SharedClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl SharedClient<RawCodec> {
    /// Build a shared client storing raw bytes.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self::from_client(Client::new(config)?))
    }
}

impl<C: ValueCodec> SharedClient<C> {
    /// Wrap an already-configured client.
    pub fn from_client(client: Client<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(client)),
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<C::Value>> {
        self.inner.lock().get(key)
    }

    pub fn get_multi<K: AsRef<str>>(&self, keys: &[K]) -> Result<HashMap<String, C::Value>> {
        self.inner.lock().get_multi(keys)
    }

    pub fn set(&self, key: &str, value: &C::Value, expiry: u32) -> Result<()> {
        self.inner.lock().set(key, value, expiry)
    }

    pub fn add(&self, key: &str, value: &C::Value, expiry: u32) -> Result<bool> {
        self.inner.lock().add(key, value, expiry)
    }

    pub fn delete(&self, key: &str, delay: u32) -> Result<()> {
        self.inner.lock().delete(key, delay)
    }

    pub fn stats(&self) -> Result<HashMap<String, HashMap<String, String>>> {
        self.inner.lock().stats()
    }

    pub fn reset(&self) {
        self.inner.lock().reset()
    }

    /// Run `f` with exclusive access to the underlying client, for roster
    /// swaps or endpoint inspection.
    pub fn with_client<T>(&self, f: impl FnOnce(&mut Client<C>) -> T) -> T {
        f(&mut self.inner.lock())
    }
}
