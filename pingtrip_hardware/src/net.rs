use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use pingtrip_traits::{BoxError, Transport};
use tracing::{debug, trace};

use crate::error::HwError;

/// Upper bound on bytes drained from one response.
const MAX_DRAIN_BYTES: usize = 16 * 1024;

/// Plain TCP transport for the telemetry endpoint.
pub struct TcpTransport {
    stream: Option<TcpStream>,
    /// How long `read_available` waits for response bytes before giving up.
    drain_timeout: Duration,
}

impl TcpTransport {
    pub fn new(drain_timeout: Duration) -> Self {
        Self {
            stream: None,
            drain_timeout,
        }
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(Duration::from_millis(250))
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<(), BoxError> {
        self.close();
        let target = format!("{host}:{port}");
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|e| HwError::Connect(format!("{target}: {e}")))?;
        let mut last_err: Option<std::io::Error> = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_write_timeout(Some(timeout))?;
                    stream.set_read_timeout(Some(self.drain_timeout.max(Duration::from_millis(1))))?;
                    debug!(%addr, "telemetry transport connected");
                    self.stream = Some(stream);
                    return Ok(());
                }
                Err(e) => last_err = Some(e),
            }
        }
        let detail = last_err.map_or_else(|| "no addresses".to_string(), |e| e.to_string());
        Err(Box::new(HwError::Connect(format!("{target}: {detail}"))))
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        let stream = self.stream.as_mut().ok_or(HwError::NotConnected)?;
        stream.write_all(bytes).map_err(HwError::Io)?;
        stream.flush().map_err(HwError::Io)?;
        trace!(len = bytes.len(), "telemetry bytes sent");
        Ok(())
    }

    fn read_available(&mut self) -> Result<Vec<u8>, BoxError> {
        let stream = self.stream.as_mut().ok_or(HwError::NotConnected)?;
        let mut out = Vec::new();
        let mut buf = [0u8; 1024];
        while out.len() < MAX_DRAIN_BYTES {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => out.extend_from_slice(&buf[..n]),
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Box::new(HwError::Io(e))),
            }
        }
        Ok(out)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.close();
    }
}
