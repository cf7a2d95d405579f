use std::{
    io::{ErrorKind, Read, Write},
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use url::{Host, Url};

use super::Transport;
use crate::{
    config::ClientConfig,
    errors::{Result, TspError, TspErrorKind, TspResult},
};

/// `tsaMsg` flag byte of a direct request or response.
pub const TSA_MSG_DIRECT: u8 = 0x00;

/// Length prefix plus flag byte.
pub const HEADER_LEN: usize = 5;

const READ_BUFFER_SIZE: usize = 1024;

/// RFC 3161 over a raw TCP socket, one connection per request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TcpTransport {
    host: String,
    port: u16,
    timeout: Option<Duration>,
}

impl TcpTransport {
    pub fn new(host: impl Into<String>, port: u16, config: &ClientConfig) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: config.timeout,
        }
    }

    /// `tcp://host[:port]`; the port defaults to 318.
    pub fn from_url(url: &Url, config: &ClientConfig) -> Result<Self> {
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_owned(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => {
                return Err(TspError::new(
                    TspErrorKind::InvalidInput,
                    format!("TSA address {} has no host", url),
                ))
            }
        };
        let port = url.port().unwrap_or(ClientConfig::DEFAULT_TCP_PORT);

        Ok(Self::new(host, port, config))
    }

    pub fn host(self: &Self) -> &str {
        &self.host
    }

    pub fn port(self: &Self) -> u16 {
        self.port
    }

    fn connect(self: &Self) -> Result<TcpStream> {
        let Some(timeout) = self.timeout else {
            return TcpStream::connect((self.host.as_str(), self.port))
                .map_app_err(TspErrorKind::TransportError);
        };

        let mut last_err = None;
        let addrs = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_app_err(TspErrorKind::TransportError)?;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return Ok(stream),
                Err(err) => last_err = Some(err),
            }
        }

        Err(match last_err {
            Some(err) => TspError::with_source(TspErrorKind::TransportError, err),
            None => TspError::new(
                TspErrorKind::TransportError,
                format!("{} did not resolve", self.host),
            ),
        })
    }
}

impl Transport for TcpTransport {
    fn send(&self, request: &[u8]) -> Result<Vec<u8>> {
        let framed = frame_request(request)?;

        tracing::debug!(host = %self.host, port = self.port, len = request.len(), "sending time-stamp query");
        let mut stream = self.connect()?;
        stream
            .set_read_timeout(self.timeout)
            .map_app_err(TspErrorKind::TransportError)?;
        stream
            .set_write_timeout(self.timeout)
            .map_app_err(TspErrorKind::TransportError)?;

        stream
            .write_all(&framed)
            .map_app_err(TspErrorKind::TransportError)?;
        stream.flush().map_app_err(TspErrorKind::TransportError)?;

        let response = read_framed_response(&mut stream)?;
        tracing::debug!(host = %self.host, len = response.len(), "received time-stamp reply");

        Ok(response)
    }
}

/// Prefixes `request` with its 4-byte big-endian length `L + 1` and the
/// direct-request flag counted by that `+ 1`.
pub fn frame_request(request: &[u8]) -> Result<Vec<u8>> {
    let length = u32::try_from(request.len() + 1).map_err(|_| {
        TspError::new(
            TspErrorKind::InvalidInput,
            format!("request of {} bytes is too large to frame", request.len()),
        )
    })?;

    let mut framed = Vec::with_capacity(HEADER_LEN + request.len());
    framed.extend_from_slice(&length.to_be_bytes());
    framed.push(TSA_MSG_DIRECT);
    framed.extend_from_slice(request);

    Ok(framed)
}

/// Reads until EOF and returns everything after the 5-byte header.
///
/// The header is normally all in the first chunk. A short first chunk has its
/// remaining header bytes taken from the next one; payload bytes are never
/// dropped.
pub fn read_framed_response<R: Read>(mut reader: R) -> Result<Vec<u8>> {
    let mut buf = [0u8; READ_BUFFER_SIZE];
    let mut header = Vec::with_capacity(HEADER_LEN);
    let mut response = Vec::new();

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TspError::with_source(TspErrorKind::TransportError, err)),
        };

        let skip = (HEADER_LEN - header.len()).min(n);
        header.extend_from_slice(&buf[..skip]);
        response.extend_from_slice(&buf[skip..n]);
    }

    if header.len() < HEADER_LEN {
        return Err(TspError::new(
            TspErrorKind::InvalidResponse,
            format!("connection closed after {} header bytes", header.len()),
        ));
    }

    let declared = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    if declared != response.len() + 1 {
        tracing::warn!(
            declared,
            received = response.len(),
            flag = header[4],
            "TCP response length prefix does not match the payload"
        );
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use std::{net::TcpListener, thread};

    use super::*;

    /// Hands out fixed-size chunks of its data, one per read.
    struct ChunkedReader {
        chunks: Vec<Vec<u8>>,
    }

    impl Read for ChunkedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.chunks.is_empty() {
                return Ok(0);
            }
            let chunk = self.chunks.remove(0);
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }
    }

    #[test]
    fn frame_prefix_is_length_plus_one() {
        let request = vec![0xaa; 300];
        let framed = frame_request(&request).unwrap();

        assert_eq!(&framed[..4], &301u32.to_be_bytes());
        assert_eq!(framed[4], TSA_MSG_DIRECT);
        assert_eq!(&framed[HEADER_LEN..], &request[..]);
        assert_eq!(framed.len(), request.len() + HEADER_LEN);
    }

    #[test]
    fn header_stripped_from_first_chunk_only() {
        // the later chunks start with bytes that look like a header
        let reader = ChunkedReader {
            chunks: vec![
                vec![0x00, 0x00, 0x00, 0x07, 0x00, 0x30, 0x04],
                vec![0x00, 0x00, 0x00, 0x00, 0x00],
                vec![0x01],
            ],
        };

        let response = read_framed_response(reader).unwrap();
        assert_eq!(response, vec![0x30, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn short_first_chunk() {
        let reader = ChunkedReader {
            chunks: vec![vec![0x00, 0x00, 0x00], vec![0x03, 0x00, 0x30, 0x00], vec![0x05]],
        };

        assert_eq!(read_framed_response(reader).unwrap(), vec![0x30, 0x00, 0x05]);
    }

    #[test]
    fn truncated_header() {
        let reader = ChunkedReader {
            chunks: vec![vec![0x00, 0x00]],
        };
        let err = read_framed_response(reader).unwrap_err();

        assert_eq!(err.kind, TspErrorKind::InvalidResponse);
    }

    #[test]
    fn loopback_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();

            let mut prefix = [0u8; 4];
            stream.read_exact(&mut prefix).unwrap();
            let mut message = vec![0u8; u32::from_be_bytes(prefix) as usize];
            stream.read_exact(&mut message).unwrap();

            // echo the request back as the response payload
            stream.write_all(&frame_request(&message[1..]).unwrap()).unwrap();
            message
        });

        let config = ClientConfig::default().with_timeout(Duration::from_secs(10));
        let url = Url::parse(&format!("tcp://127.0.0.1:{}", port)).unwrap();
        let transport = TcpTransport::from_url(&url, &config).unwrap();

        let response = transport.send(&[0x30, 0x01, 0xff]).unwrap();
        let seen = server.join().unwrap();

        assert_eq!(seen, vec![TSA_MSG_DIRECT, 0x30, 0x01, 0xff]);
        assert_eq!(response, vec![0x30, 0x01, 0xff]);
    }

    #[test]
    fn default_port() {
        let url = Url::parse("tcp://tsa.example.com").unwrap();
        let transport = TcpTransport::from_url(&url, &ClientConfig::default()).unwrap();

        assert_eq!(transport.host(), "tsa.example.com");
        assert_eq!(transport.port(), 318);

        let url = Url::parse("tcp://[::1]:3180").unwrap();
        let transport = TcpTransport::from_url(&url, &ClientConfig::default()).unwrap();
        assert_eq!(transport.host(), "::1");
    }

    #[test]
    fn connection_refused() {
        // bind then drop to get a port nobody listens on
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let transport = TcpTransport::new("127.0.0.1", port, &ClientConfig::default());

        let err = transport.send(&[0x30, 0x00]).unwrap_err();
        assert_eq!(err.kind, TspErrorKind::TransportError);
    }
}
