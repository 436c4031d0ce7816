//! Buffered TCP connection to a single cache server.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

/// TCP connect bound. Design-fixed: the connect must fail fast so selection
/// can rehash to an alternate server.
pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Debug)]
pub(crate) struct Connection {
    reader: BufReader<TcpStream>,
}

impl Connection {
    /// Open a connection with the fixed connect timeout and the given read
    /// timeout. Tries each resolved address in turn.
    pub fn open(host: &str, port: u16, request_timeout: Duration) -> io::Result<Self> {
        let mut last_err = None;
        for addr in (host, port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    let read_timeout = (!request_timeout.is_zero()).then_some(request_timeout);
                    stream.set_read_timeout(read_timeout)?;
                    debug!(host, port, "connected");
                    return Ok(Self {
                        reader: BufReader::new(stream),
                    });
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot resolve address: {host}:{port}"),
            )
        }))
    }

    pub fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.reader.get_mut().write_all(buf)
    }

    /// Read one response line, with the CRLF terminator stripped.
    ///
    /// A clean remote close mid-response surfaces as `UnexpectedEof`.
    pub fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let mut line = Vec::with_capacity(64);
        let n = self.reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server closed connection",
            ));
        }
        if line.ends_with(b"\n") {
            line.pop();
        }
        if line.ends_with(b"\r") {
            line.pop();
        }
        Ok(line)
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.reader.read_exact(buf)
    }
}
