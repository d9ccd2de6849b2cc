//! Shared test harness: an in-memory dialer and the server side of each
//! connection it hands out.

#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use pubsub_protocol::{Message, MsgPackCodec, ProtocolError, read_message, write_message};
use pubsub_transport::{Dialer, TransportError};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf, ReadHalf, WriteHalf};
use tokio::sync::mpsc;

/// Generous upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(120);

// =========================================================================
// Dialer
// =========================================================================

struct Shared {
    conns: mpsc::UnboundedSender<DuplexStream>,
    failures_left: AtomicUsize,
    broken_left: AtomicUsize,
    dials: AtomicUsize,
    buffer: usize,
    /// Far ends of broken connections, kept open so their reads stay pending.
    parked: Mutex<Vec<DuplexStream>>,
}

/// Client end of a test connection. A broken one accepts the dial, never
/// delivers a byte, and fails every write with `BrokenPipe`.
pub struct TestStream {
    inner: DuplexStream,
    broken: bool,
}

impl AsyncRead for TestStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for TestStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.broken {
            return Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()));
        }
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        if self.broken {
            return Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()));
        }
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Dials by creating a `tokio::io::duplex` pair and handing the far end to
/// the paired [`TestServer`]. Can be told to fail the next N dials.
#[derive(Clone)]
pub struct TestDialer {
    shared: Arc<Shared>,
}

impl TestDialer {
    /// Makes the next `n` dials fail with "connection refused".
    pub fn fail_next(&self, n: usize) {
        self.shared.failures_left.store(n, Ordering::SeqCst);
    }

    /// Makes the next `n` successful dials hand out broken connections that
    /// fail every write. They never reach the [`TestServer`].
    pub fn break_next(&self, n: usize) {
        self.shared.broken_left.store(n, Ordering::SeqCst);
    }

    /// Total dial attempts so far, failed ones included.
    pub fn dials(&self) -> usize {
        self.shared.dials.load(Ordering::SeqCst)
    }
}

impl Dialer for TestDialer {
    type Stream = TestStream;

    async fn dial(&self) -> Result<TestStream, TransportError> {
        self.shared.dials.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .shared
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(TransportError::DialFailed(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "refused by test",
            )));
        }

        let (client, server) = tokio::io::duplex(self.shared.buffer);
        let broken = self
            .shared
            .broken_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if broken {
            self.shared.parked.lock().unwrap().push(server);
        } else {
            self.shared.conns.send(server).map_err(|_| {
                TransportError::DialFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "test server gone",
                ))
            })?;
        }
        Ok(TestStream {
            inner: client,
            broken,
        })
    }
}

/// Creates a dialer and its server whose duplex pipes buffer `buffer` bytes
/// in each direction.
pub fn pair(buffer: usize) -> (TestDialer, TestServer) {
    let (tx, rx) = mpsc::unbounded_channel();
    let dialer = TestDialer {
        shared: Arc::new(Shared {
            conns: tx,
            failures_left: AtomicUsize::new(0),
            broken_left: AtomicUsize::new(0),
            dials: AtomicUsize::new(0),
            buffer,
            parked: Mutex::new(Vec::new()),
        }),
    };
    (dialer, TestServer { conns: rx })
}

// =========================================================================
// Server side
// =========================================================================

/// Receives the server ends of dialed connections.
pub struct TestServer {
    conns: mpsc::UnboundedReceiver<DuplexStream>,
}

impl TestServer {
    /// Waits for the client's next successful dial.
    pub async fn accept(&mut self) -> ServerConn {
        let stream = tokio::time::timeout(WAIT, self.conns.recv())
            .await
            .expect("client should dial")
            .expect("dialer alive");
        let (reader, writer) = tokio::io::split(stream);
        ServerConn { reader, writer }
    }

    /// `true` if a dialed connection is waiting to be accepted.
    pub fn has_pending(&self) -> bool {
        !self.conns.is_empty()
    }
}

/// Server end of one connection.
pub struct ServerConn {
    reader: ReadHalf<DuplexStream>,
    pub writer: WriteHalf<DuplexStream>,
}

impl ServerConn {
    /// Reads the next frame the client wrote.
    pub async fn try_recv(&mut self) -> Result<Message, ProtocolError> {
        tokio::time::timeout(WAIT, read_message(&MsgPackCodec, &mut self.reader))
            .await
            .expect("frame should arrive")
    }

    /// Reads the next frame, panicking if the connection ends first.
    pub async fn recv(&mut self) -> Message {
        self.try_recv().await.expect("connection should stay open")
    }

    /// Writes a frame to the client.
    pub async fn send(&mut self, message: &Message) {
        write_message(&MsgPackCodec, &mut self.writer, message)
            .await
            .expect("client should be reading");
    }
}

/// Accepts connections until one delivers a frame matching `wanted`,
/// skipping bootstrap frames and connections that close early.
pub async fn accept_until(
    server: &mut TestServer,
    wanted: &Message,
) -> ServerConn {
    loop {
        let mut conn = server.accept().await;
        loop {
            match conn.try_recv().await {
                Ok(m) if &m == wanted => return conn,
                Ok(_) => continue,
                Err(_) => break,
            }
        }
    }
}
