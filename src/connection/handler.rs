//! Connection Handler
//!
//! One handler per accepted connection, running on its own task. The
//! lifecycle is `Accepting → Serving → Closed`:
//!
//! ```text
//! 1. Client connects
//!        │
//!        ▼
//! 2. ┌──────────────────────────────────┐
//!    │         Serving loop             │
//!    │                                  │
//!    │  read bytes into the buffer      │
//!    │  while the buffer holds a '\n':  │
//!    │      split off one line          │
//!    │      dispatch it                 │
//!    │      write reply + '\n'          │
//!    └──────────────────────────────────┘
//!        │
//!        ▼
//! 3. Peer closes (zero-length read), QUIT, or an error
//! ```
//!
//! TCP is a stream, so one read may carry half a command or several whole
//! ones; the `BytesMut` buffer absorbs both cases. A connection-level
//! failure tears down that connection only — the store and every other
//! connection are untouched.

use crate::commands::{Dispatcher, Outcome};
use crate::protocol::Reply;
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, error, info, trace, warn};

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
///
/// Owns the read buffer and the framing; every complete line goes through
/// the dispatcher and its reply is written straight back.
pub struct ConnectionHandler {
    /// The TCP stream for this connection
    stream: BufWriter<TcpStream>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// The command dispatcher (a handle onto the shared store)
    dispatcher: Dispatcher,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    /// Creates a new connection handler.
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        dispatcher: Dispatcher,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            dispatcher,
            stats,
        }
    }

    /// Runs the connection to completion.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.serve_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    debug!(client = %self.addr, "Client disconnected")
                }
                ConnectionError::IoError(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                _ => warn!(client = %self.addr, error = %e, "Connection error"),
            },
        }

        self.stats.connection_closed();
        result
    }

    /// The read-dispatch-respond loop.
    async fn serve_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            // Drain every complete line already buffered before reading more.
            while let Some(line) = self.next_line()? {
                trace!(client = %self.addr, line = %line, "Received line");

                match self.dispatcher.dispatch(&line) {
                    Outcome::Silent => {}
                    Outcome::Reply(reply) => {
                        self.stats.command_processed();
                        self.send_reply(&reply).await?;
                    }
                    Outcome::Close(reply) => {
                        self.stats.command_processed();
                        self.send_reply(&reply).await?;
                        debug!(client = %self.addr, "QUIT received, closing connection");
                        return Ok(());
                    }
                }
            }

            self.read_more_data().await?;
        }
    }

    /// Splits one line off the front of the buffer, if a newline is there.
    fn next_line(&mut self) -> Result<Option<String>, ConnectionError> {
        let pos = match self.buffer.iter().position(|&b| b == b'\n') {
            Some(pos) => pos,
            None => return Ok(None),
        };

        let raw = self.buffer.split_to(pos + 1);
        let line = std::str::from_utf8(&raw[..pos]).map_err(|_| ConnectionError::InvalidUtf8)?;
        Ok(Some(line.trim().to_string()))
    }

    /// Reads more data from the socket into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                "Buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            // Zero-length read: the peer closed its end.
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            } else {
                return Err(ConnectionError::UnexpectedEof);
            }
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }

    /// Writes one rendered reply plus the terminating newline.
    async fn send_reply(&mut self, reply: &Reply) -> Result<(), ConnectionError> {
        let mut payload = reply.render();
        payload.push('\n');

        self.stream.write_all(payload.as_bytes()).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(payload.len());
        trace!(
            client = %self.addr,
            bytes = payload.len(),
            "Sent reply"
        );
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
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Peer closed with a partial line still buffered
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// A single line exceeded the buffer size limit
    #[error("Buffer size limit exceeded")]
    BufferFull,

    /// The payload is supposed to be text
    #[error("Request line is not valid UTF-8")]
    InvalidUtf8,
}

/// Handles a client connection to completion.
///
/// Convenience wrapper used by the accept loop; expected error endings
/// (peer disconnect, reset) are already logged at lower levels.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    dispatcher: Dispatcher,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, dispatcher, stats);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::IoError(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "Connection ended with error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Store;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn create_test_server() -> (SocketAddr, Arc<Mutex<Store>>, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Arc::new(Mutex::new(Store::new()));
        let stats = Arc::new(ConnectionStats::new());

        let store_clone = Arc::clone(&store);
        let stats_clone = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let dispatcher = Dispatcher::new(Arc::clone(&store_clone));
                let stats = Arc::clone(&stats_clone);
                tokio::spawn(handle_connection(stream, client_addr, dispatcher, stats));
            }
        });

        (addr, store, stats)
    }

    async fn read_chunk(client: &mut TcpStream) -> String {
        let mut buf = [0u8; 1024];
        let n = client.read(&mut buf).await.unwrap();
        String::from_utf8_lossy(&buf[..n]).to_string()
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let (addr, _, _) = create_test_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"PING\n").await.unwrap();

        assert_eq!(read_chunk(&mut client).await, "PONG\n");
    }

    #[tokio::test]
    async fn test_set_get_round_trip() {
        let (addr, _, _) = create_test_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"SET name Johan\n").await.unwrap();
        assert_eq!(read_chunk(&mut client).await, "OK\n");

        client.write_all(b"GET name\n").await.unwrap();
        assert_eq!(read_chunk(&mut client).await, "Johan\n");

        client.write_all(b"GET missing\n").await.unwrap();
        assert_eq!(read_chunk(&mut client).await, "Nil\n");
    }

    #[tokio::test]
    async fn test_list_reply_spans_lines() {
        let (addr, _, _) = create_test_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"RPUSH l a b c\n").await.unwrap();
        assert_eq!(read_chunk(&mut client).await, ":3\n");

        client.write_all(b"LRANGE l 0 -1\n").await.unwrap();
        assert_eq!(read_chunk(&mut client).await, "a\nb\nc\n");
    }

    #[tokio::test]
    async fn test_several_commands_in_one_packet() {
        let (addr, _, _) = create_test_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();

        // Also exercises the blank-line no-op: no extra reply line appears.
        client
            .write_all(b"SET k1 v1\n\nSET k2 v2\nGET k1\nGET k2\n")
            .await
            .unwrap();

        let mut collected = String::new();
        while collected.matches('\n').count() < 4 {
            collected.push_str(&read_chunk(&mut client).await);
        }
        assert_eq!(collected, "OK\nOK\nv1\nv2\n");
    }

    #[tokio::test]
    async fn test_partial_lines_are_buffered() {
        let (addr, _, _) = create_test_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"SET na").await.unwrap();
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        client.write_all(b"me Johan\nGET name\n").await.unwrap();

        let mut collected = String::new();
        while collected.matches('\n').count() < 2 {
            collected.push_str(&read_chunk(&mut client).await);
        }
        assert_eq!(collected, "OK\nJohan\n");
    }

    #[tokio::test]
    async fn test_quit_replies_then_closes() {
        let (addr, _, _) = create_test_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"QUIT\n").await.unwrap();

        assert_eq!(read_chunk(&mut client).await, "OK\n");

        // The server side is gone now; the next read sees EOF.
        let mut buf = [0u8; 8];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_errors_keep_the_connection_alive() {
        let (addr, _, _) = create_test_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"NOSUCHCMD\n").await.unwrap();
        assert_eq!(
            read_chunk(&mut client).await,
            "ERROR: Unknown command 'NOSUCHCMD'\n"
        );

        client.write_all(b"PING\n").await.unwrap();
        assert_eq!(read_chunk(&mut client).await, "PONG\n");
    }

    #[tokio::test]
    async fn test_connection_stats() {
        let (addr, _, stats) = create_test_server().await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);

        let mut client = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);

        client.write_all(b"PING\n").await.unwrap();
        let _ = read_chunk(&mut client).await;

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert!(stats.commands_processed.load(Ordering::Relaxed) >= 1);
        assert!(stats.bytes_read.load(Ordering::Relaxed) > 0);
        assert!(stats.bytes_written.load(Ordering::Relaxed) > 0);

        drop(client);
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_shared_store_across_connections() {
        let (addr, _, _) = create_test_server().await;

        let mut writer = TcpStream::connect(addr).await.unwrap();
        writer.write_all(b"SET shared 42\n").await.unwrap();
        let _ = read_chunk(&mut writer).await;

        let mut reader = TcpStream::connect(addr).await.unwrap();
        reader.write_all(b"GET shared\n").await.unwrap();
        assert_eq!(read_chunk(&mut reader).await, "42\n");
    }
}
