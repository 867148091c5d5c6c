//! Connection Handler
//!
//! One async task per client. The handler accumulates bytes in a
//! `BytesMut` buffer, frames CRLF-terminated request lines out of it,
//! dispatches each through the shared [`CommandHandler`], and writes the
//! reply back. TCP is a stream: a single read may carry a partial line
//! or several pipelined lines, and both cases fall out of the
//! frame-then-read loop.
//!
//! Empty request lines are ignored. A malformed request produces an
//! error reply, never a disconnect; the connection ends when the client
//! goes away or the buffer cap is exceeded.

use crate::commands::CommandHandler;
use crate::protocol::next_request;
use bytes::{Buf, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

/// Maximum size for the read buffer (64 KB)
const MAX_BUFFER_SIZE: usize = 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
pub struct ConnectionHandler {
    /// The TCP stream for this connection
    stream: BufWriter<TcpStream>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// The command handler (shared across connections)
    command_handler: CommandHandler,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            stats,
        }
    }

    /// Runs the connection until the client disconnects or an error
    /// occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "client disconnected"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    debug!(client = %self.addr, "client disconnected")
                }
                ConnectionError::IoError(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "connection reset by client")
                }
                _ => warn!(client = %self.addr, error = %e, "connection error"),
            },
        }

        self.stats.connection_closed();
        result
    }

    /// The frame-dispatch-reply loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some((tokens, consumed)) = next_request(&self.buffer) {
                self.buffer.advance(consumed);

                // empty lines carry no request
                if tokens.is_empty() {
                    continue;
                }

                let reply = self.command_handler.execute(&tokens);
                self.stats.command_processed();
                trace!(
                    client = %self.addr,
                    command = %String::from_utf8_lossy(&tokens[0]),
                    "dispatched request"
                );

                self.send_reply(&reply.serialize()).await?;
            }

            // Need more data - read from the socket
            self.read_more_data().await?;
        }
    }

    /// Reads more data from the socket into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            warn!(
                client = %self.addr,
                size = self.buffer.len(),
                "buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            // Connection closed by client
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            } else {
                // Partial request line left behind
                return Err(ConnectionError::UnexpectedEof);
            }
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "read data");

        Ok(())
    }

    /// Writes one serialized reply.
    async fn send_reply(&mut self, bytes: &[u8]) -> Result<(), ConnectionError> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        Ok(())
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Client disconnected normally
    #[error("client disconnected")]
    ClientDisconnected,

    /// Stream ended mid-line
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// Buffer size limit exceeded
    #[error("buffer size limit exceeded")]
    BufferFull,
}

/// Creates a [`ConnectionHandler`] and runs it to completion, folding
/// expected disconnects into silence.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::IoError(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "connection ended with error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageEngine;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn create_test_server(
        engine: StorageEngine,
    ) -> (SocketAddr, Arc<StorageEngine>, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let storage = Arc::new(engine);
        let stats = Arc::new(ConnectionStats::new());

        let storage_clone = Arc::clone(&storage);
        let stats_clone = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let handler = CommandHandler::new(Arc::clone(&storage_clone));
                let stats = Arc::clone(&stats_clone);
                tokio::spawn(handle_connection(stream, client_addr, handler, stats));
            }
        });

        (addr, storage, stats)
    }

    async fn send(client: &mut TcpStream, line: &str) -> Vec<u8> {
        client.write_all(line.as_bytes()).await.unwrap();
        client.write_all(b"\r\n").await.unwrap();

        let mut buf = [0u8; 512];
        let n = client.read(&mut buf).await.unwrap();
        buf[..n].to_vec()
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let (addr, _, _) = create_test_server(StorageEngine::new()).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        assert_eq!(send(&mut client, "PING").await, b"+PONG\r\n");
    }

    #[tokio::test]
    async fn test_string_lifecycle_over_the_wire() {
        let (addr, _, _) = create_test_server(StorageEngine::new()).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        assert_eq!(send(&mut client, "SET greet hello").await, b"+OK\r\n");
        assert_eq!(send(&mut client, "GET greet").await, b"$5\r\nhello\r\n");
        assert_eq!(send(&mut client, "DEL greet").await, b":1\r\n");
        assert_eq!(send(&mut client, "GET greet").await, b"$-1\r\n");
    }

    #[tokio::test]
    async fn test_wrongtype_over_the_wire() {
        let (addr, _, _) = create_test_server(StorageEngine::new()).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        assert_eq!(send(&mut client, "SET a 1").await, b"+OK\r\n");
        assert_eq!(
            send(&mut client, "LPUSH a 2").await,
            b"-WRONGTYPE Operation against a key holding the wrong kind of value\r\n".to_vec()
        );
        // the connection survives the error
        assert_eq!(send(&mut client, "PING").await, b"+PONG\r\n");
    }

    #[tokio::test]
    async fn test_list_range_over_the_wire() {
        let (addr, _, _) = create_test_server(StorageEngine::new()).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        assert_eq!(send(&mut client, "RPUSH l x").await, b":1\r\n");
        assert_eq!(send(&mut client, "RPUSH l y").await, b":2\r\n");
        assert_eq!(send(&mut client, "RPUSH l z").await, b":3\r\n");
        assert_eq!(
            send(&mut client, "LRANGE l 0 -1").await,
            b"*3\r\n$1\r\nx\r\n$1\r\ny\r\n$1\r\nz\r\n".to_vec()
        );
        assert_eq!(send(&mut client, "LINDEX l -1").await, b"$1\r\nz\r\n");
    }

    #[tokio::test]
    async fn test_eviction_over_the_wire() {
        let (addr, _, _) = create_test_server(StorageEngine::with_capacity(2)).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        send(&mut client, "SET k1 v1").await;
        send(&mut client, "SET k2 v2").await;
        send(&mut client, "SET k3 v3").await;

        assert_eq!(send(&mut client, "GET k1").await, b"$-1\r\n");
        assert_eq!(send(&mut client, "GET k2").await, b"$2\r\nv2\r\n");
        assert_eq!(send(&mut client, "GET k3").await, b"$2\r\nv3\r\n");
    }

    #[tokio::test]
    async fn test_empty_lines_are_ignored() {
        let (addr, _, _) = create_test_server(StorageEngine::new()).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"\r\n\r\nPING\r\n").await.unwrap();

        let mut buf = [0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"+PONG\r\n");
    }

    #[tokio::test]
    async fn test_pipelined_requests_in_one_write() {
        let (addr, _, _) = create_test_server(StorageEngine::new()).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"SET k1 v1\r\nSET k2 v2\r\nGET k1\r\nGET k2\r\n")
            .await
            .unwrap();

        // Expected: +OK\r\n+OK\r\n$2\r\nv1\r\n$2\r\nv2\r\n (26 bytes)
        let mut buf = vec![0u8; 256];
        let mut total = 0;
        let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(2);

        while total < 26 && tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(
                tokio::time::Duration::from_millis(100),
                client.read(&mut buf[total..]),
            )
            .await
            {
                Ok(Ok(n)) if n > 0 => total += n,
                _ => break,
            }
        }

        assert_eq!(&buf[..total], b"+OK\r\n+OK\r\n$2\r\nv1\r\n$2\r\nv2\r\n");
    }

    #[tokio::test]
    async fn test_connection_stats() {
        let (addr, _, stats) = create_test_server(StorageEngine::new()).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);

        let mut client = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);

        send(&mut client, "PING").await;
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert!(stats.commands_processed.load(Ordering::Relaxed) >= 1);
        assert!(stats.bytes_read.load(Ordering::Relaxed) > 0);
        assert!(stats.bytes_written.load(Ordering::Relaxed) > 0);

        drop(client);
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }
}
