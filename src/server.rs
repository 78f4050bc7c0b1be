//! TCP server for the echo protocol.
//!
//! Accepts connections and runs one session task per client. Sessions share
//! nothing but the read-only protocol settings.

use crate::config::Config;
use crate::protocols::echo::{run_session, SessionConfig, SessionEnd};
use crate::runtime::SocketConn;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// Server instance
pub struct Server {
    listener: TcpListener,
    session: Arc<SessionConfig>,
    read_chunk_size: usize,
}

impl Server {
    /// Bind the listening socket.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(config: &Config) -> io::Result<Self> {
        let addr: SocketAddr = config
            .listen
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let listener = TcpListener::from_std(create_listener(addr)?)?;

        Ok(Server {
            listener,
            session: Arc::new(config.session()),
            read_chunk_size: config.read_chunk_size,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the task is dropped.
    pub async fn run(self) -> io::Result<()> {
        info!(address = %self.local_addr()?, "Server listening");

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    info!(peer = %peer, "New connection");

                    let session = Arc::clone(&self.session);
                    let chunk_size = self.read_chunk_size;
                    tokio::spawn(async move {
                        handle_connection(stream, peer, &session, chunk_size).await;
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

/// Serve a single client, then release its socket whatever the outcome.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    session: &SessionConfig,
    chunk_size: usize,
) {
    let mut conn = SocketConn::new(stream, chunk_size);

    match run_session(&mut conn, session).await {
        Ok(SessionEnd::PeerClosed) => debug!(peer = %peer, "Connection closed by client"),
        Ok(SessionEnd::Sentinel) => debug!(peer = %peer, "Client said goodbye"),
        Err(e) => warn!(peer = %peer, error = %e, "Connection error"),
    }

    conn.close().await;
}

/// Create a non-blocking TCP listener with SO_REUSEADDR so the fixed port
/// can be rebound right after a restart.
fn create_listener(addr: SocketAddr) -> io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;

    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};

    fn test_config() -> Config {
        Config {
            listen: "127.0.0.1:0".to_string(),
            read_chunk_size: 1024,
            max_line_length: 128,
            sentinel: "Muthiti!".to_string(),
            farewell: "Muthiti uu twonane ivinda yingi!\n".to_string(),
            log_level: "info".to_string(),
        }
    }

    async fn start() -> SocketAddr {
        let server = Server::bind(&test_config()).unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());
        addr
    }

    #[tokio::test]
    async fn test_bind_rejects_bad_address() {
        let mut config = test_config();
        config.listen = "not an address".to_string();
        let err = Server::bind(&config).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_echo_over_tcp() {
        let addr = start().await;
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        writer.write_all(b"ping\n").await.unwrap();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line, "Echo: ping\n");

        // A line split over two writes comes back whole
        line.clear();
        writer.write_all(b"hel").await.unwrap();
        writer.flush().await.unwrap();
        writer.write_all(b"lo\n").await.unwrap();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line, "Echo: hello\n");
    }

    #[tokio::test]
    async fn test_sentinel_closes_connection() {
        let addr = start().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(b"Muthiti!\n").await.unwrap();

        let mut received = Vec::new();
        stream.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"Muthiti uu twonane ivinda yingi!\n");
    }

    #[tokio::test]
    async fn test_clients_are_independent() {
        let addr = start().await;
        let mut first = TcpStream::connect(addr).await.unwrap();
        let mut second = TcpStream::connect(addr).await.unwrap();

        // First client stays parked mid-line while the second is served
        first.write_all(b"half a li").await.unwrap();
        second.write_all(b"two\n").await.unwrap();

        let mut reply = [0u8; 10];
        second.read_exact(&mut reply).await.unwrap();
        assert_eq!(&reply, b"Echo: two\n");

        first.write_all(b"ne\n").await.unwrap();
        let mut reply = [0u8; 18];
        first.read_exact(&mut reply).await.unwrap();
        assert_eq!(&reply, b"Echo: half a line\n");
    }

    #[tokio::test]
    async fn test_overlong_line_is_rejected() {
        let addr = start().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(&[b'x'; 200]).await.unwrap();

        let mut received = Vec::new();
        stream.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"ERROR line too long\n");
    }
}
