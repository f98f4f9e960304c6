//! Blocking TCP+TLS client stream.
//!
//! SNI is set to the endpoint host and peer verification runs against the
//! platform trust store. A socket receive timeout makes reads return
//! [`NetError::WouldBlock`] instead of blocking forever, which is what lets
//! the session loop re-check its cancel flag every ~200 ms.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use anytalk_foundation::{Endpoint, NetError, Scheme};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A stream that is either plain TCP or TLS over TCP. Loopback test servers
/// use the plain arm; the real service is always TLS.
pub enum MaybeTlsStream {
    Plain(TcpStream),
    Tls(native_tls::TlsStream<TcpStream>),
}

impl MaybeTlsStream {
    fn tcp(&self) -> &TcpStream {
        match self {
            MaybeTlsStream::Plain(s) => s,
            MaybeTlsStream::Tls(s) => s.get_ref(),
        }
    }

    /// Configure the socket receive timeout. `None` blocks indefinitely.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), NetError> {
        self.tcp()
            .set_read_timeout(timeout)
            .map_err(NetError::TlsRead)
    }

    /// Idempotent close. Sends the TLS close_notify when applicable and
    /// shuts the socket down in both directions; errors from an
    /// already-closed peer are ignored.
    pub fn close(&mut self) {
        if let MaybeTlsStream::Tls(s) = self {
            let _ = s.shutdown();
        }
        let _ = self.tcp().shutdown(Shutdown::Both);
    }
}

impl Read for MaybeTlsStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            MaybeTlsStream::Plain(s) => s.read(buf),
            MaybeTlsStream::Tls(s) => s.read(buf),
        }
    }
}

impl Write for MaybeTlsStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            MaybeTlsStream::Plain(s) => s.write(buf),
            MaybeTlsStream::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            MaybeTlsStream::Plain(s) => s.flush(),
            MaybeTlsStream::Tls(s) => s.flush(),
        }
    }
}

/// Resolve the endpoint host (v4 or v6), open a TCP connection and, for
/// `wss`, complete the TLS handshake.
pub fn connect(endpoint: &Endpoint) -> Result<MaybeTlsStream, NetError> {
    let addrs: Vec<SocketAddr> = (endpoint.host.as_str(), endpoint.port)
        .to_socket_addrs()
        .map_err(|source| NetError::Dns {
            host: endpoint.host.clone(),
            source,
        })?
        .collect();

    let mut last_err: Option<io::Error> = None;
    let mut tcp = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(s) => {
                tcp = Some(s);
                break;
            }
            Err(e) => last_err = Some(e),
        }
    }
    let tcp = tcp.ok_or_else(|| {
        NetError::Tcp(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no address resolved")
        }))
    })?;
    tcp.set_nodelay(true).map_err(NetError::Tcp)?;

    match endpoint.scheme {
        Scheme::Ws => Ok(MaybeTlsStream::Plain(tcp)),
        Scheme::Wss => {
            let connector = native_tls::TlsConnector::new()
                .map_err(|e| NetError::TlsHandshake(e.to_string()))?;
            let stream = connector
                .connect(&endpoint.host, tcp)
                .map_err(|e| NetError::TlsHandshake(e.to_string()))?;
            tracing::debug!(host = %endpoint.host, "tls handshake complete");
            Ok(MaybeTlsStream::Tls(stream))
        }
    }
}

/// Map a read-side io error to the transport taxonomy. Receive timeouts show
/// up as `WouldBlock` or `TimedOut` depending on the platform; both mean
/// "no data yet", never "broken".
pub(crate) fn classify_read_err(e: io::Error) -> NetError {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => NetError::WouldBlock,
        io::ErrorKind::UnexpectedEof
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe => NetError::ConnectionClosed,
        _ => NetError::TlsRead(e),
    }
}

pub(crate) fn classify_write_err(e: io::Error) -> NetError {
    match e.kind() {
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe => NetError::ConnectionClosed,
        _ => NetError::TlsWrite(e),
    }
}
