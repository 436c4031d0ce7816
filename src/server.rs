//! Per-server endpoint lifecycle.
//!
//! Each endpoint owns at most one TCP connection and tracks whether its
//! server is reachable. A failed connect marks the endpoint dead for a
//! cooldown window, during which selection skips it and rehashes. A failed
//! read or write on an established connection only closes the socket, so
//! the next operation reconnects immediately.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::ServerSpec;
use crate::connection::Connection;

/// How long a server stays dead after a failed connect.
pub(crate) const DEAD_COOLDOWN: Duration = Duration::from_secs(30);

#[derive(Debug)]
enum EndpointState {
    NotConnected,
    Connected(Connection),
    Dead { retry_at: Instant, reason: String },
}

/// One cache server in the pool.
#[derive(Debug)]
pub struct ServerEndpoint {
    host: String,
    port: u16,
    weight: u32,
    request_timeout: Duration,
    state: EndpointState,
}

impl ServerEndpoint {
    pub(crate) fn new(spec: ServerSpec, request_timeout: Duration) -> Self {
        Self {
            host: spec.host().to_string(),
            port: spec.port(),
            weight: spec.weight(),
            request_timeout,
            state: EndpointState::NotConnected,
        }
    }

    /// `"host:port"`, the identity used in `stats` maps and error messages.
    pub fn name(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Whether a socket is currently held open. Pure observation; never
    /// connects.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, EndpointState::Connected(_))
    }

    /// Whether the endpoint is inside its dead cooldown.
    pub fn is_dead(&self) -> bool {
        match self.state {
            EndpointState::Dead { retry_at, .. } => Instant::now() < retry_at,
            _ => false,
        }
    }

    /// Human-readable state, for monitoring.
    pub fn status(&self) -> String {
        match &self.state {
            EndpointState::NotConnected => "NOT CONNECTED".to_string(),
            EndpointState::Connected(_) => "CONNECTED".to_string(),
            EndpointState::Dead { retry_at, reason } => {
                let remaining = retry_at.saturating_duration_since(Instant::now());
                format!("DEAD: {reason}, will retry in {:.1}s", remaining.as_secs_f64())
            }
        }
    }

    /// Return the live socket, connecting lazily if needed.
    ///
    /// Returns `None` without side effects while inside the dead cooldown.
    /// A connect failure (or timeout) marks the endpoint dead and also
    /// returns `None`.
    pub(crate) fn ensure_open(&mut self) -> Option<&mut Connection> {
        match &self.state {
            EndpointState::Connected(_) => {}
            EndpointState::Dead { retry_at, .. } if Instant::now() < *retry_at => return None,
            _ => match Connection::open(&self.host, self.port, self.request_timeout) {
                Ok(conn) => self.state = EndpointState::Connected(conn),
                Err(e) => {
                    self.mark_dead(&e.to_string());
                    return None;
                }
            },
        }
        match &mut self.state {
            EndpointState::Connected(conn) => Some(conn),
            _ => None,
        }
    }

    /// Drop the socket without marking the server dead: the next use
    /// reconnects immediately. Also clears a pending dead cooldown.
    pub(crate) fn close(&mut self) {
        if self.is_connected() {
            debug!(server = %self.name(), "closing connection");
        }
        self.state = EndpointState::NotConnected;
    }

    /// Drop the socket and refuse reconnects until the cooldown elapses.
    pub(crate) fn mark_dead(&mut self, reason: &str) {
        let retry_at = Instant::now() + DEAD_COOLDOWN;
        warn!(
            server = %self.name(),
            reason,
            cooldown_secs = DEAD_COOLDOWN.as_secs(),
            "marking server dead"
        );
        self.state = EndpointState::Dead {
            retry_at,
            reason: reason.to_string(),
        };
    }
}
