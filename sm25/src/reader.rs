//! High-level reader interface

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use bytes::BytesMut;
use parking_lot::{Mutex, RwLock};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{broadcast, watch};
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use sm25_core::constants::{DEFAULT_EVENT_CAPACITY, KEEPALIVE_BYTE, PROBE_TIMEOUT};
use sm25_core::{Command, DEFAULT_PORT, FrameAssembler, SendCommand};
use sm25_transport::{BoxedReader, BoxedWriter, Stream, TcpTransport, Transport};

use crate::error::{Error, Result};
use crate::events::{ConnectionStatus, EventBus, ReaderEvent};
use crate::gate::EnrollmentGate;

const READ_BUFFER_SIZE: usize = 1024;

/// Longest `close` waits on a write half held by an in-flight write
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

/// SM25 fingerprint reader
///
/// Owns one stream connection at a time and a background task that turns
/// received bytes into [`ReaderEvent::FrameReceived`] events. Cloning is
/// cheap; every clone drives the same connection.
///
/// # Examples
///
/// ```no_run
/// use sm25::{Command, Reader, ReaderEvent, SendCommand};
///
/// #[tokio::main]
/// async fn main() -> sm25::Result<()> {
///     let reader = Reader::new("192.168.0.200", 7879);
///     let mut events = reader.subscribe();
///
///     reader.connect().await;
///     reader.send(SendCommand::new(Command::TestConnection, &[])?).await?;
///
///     while let Ok(event) = events.recv().await {
///         if let ReaderEvent::FrameReceived(frame) = event {
///             println!("{}", frame);
///             break;
///         }
///     }
///
///     reader.close().await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Reader {
    inner: Arc<Inner>,
}

/// Builder for [`Reader`]
pub struct ReaderBuilder {
    addr: String,
    port: u16,
    connect_timeout: Option<Duration>,
    event_capacity: usize,
}

impl ReaderBuilder {
    /// Set the TCP port (default: 7879)
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Bound connect attempts (default: none)
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set how many undelivered events each subscriber may fall behind
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Build a reader over TCP
    pub fn build(self) -> Reader {
        let mut transport = TcpTransport::new(self.addr, self.port);
        if let Some(limit) = self.connect_timeout {
            transport = transport.with_connect_timeout(limit);
        }

        Reader::from_parts(Box::new(transport), self.event_capacity)
    }
}

struct Inner {
    transport: Box<dyn Transport>,
    state: RwLock<ConnectionState>,
    link: Mutex<Option<Link>>,
    next_link_id: AtomicU64,
    gate: EnrollmentGate,
    events: EventBus,
    last_sent: Mutex<Option<SendCommand>>,
}

/// One open connection: its write half and the receive loop's stop signal
struct Link {
    id: u64,
    writer: Arc<tokio::sync::Mutex<BoxedWriter>>,
    cancel: watch::Sender<bool>,
}

impl Link {
    /// Stop the receive loop and release the write half
    ///
    /// A write stuck on a full socket keeps the write half locked. After
    /// [`CLOSE_TIMEOUT`] the link is dropped without a graceful shutdown.
    async fn shutdown(self) {
        let _ = self.cancel.send(true);

        let release = async {
            let mut writer = self.writer.lock().await;
            writer.shutdown().await
        };
        match timeout(CLOSE_TIMEOUT, release).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => trace!("Shutdown of write half failed: {}", e),
            Err(_) => debug!("Write half busy, dropping it without shutdown"),
        }
    }
}

impl Reader {
    /// Create a reader for a TCP device
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        Self::builder(addr).port(port).build()
    }

    /// Start configuring a reader on the default port
    pub fn builder(addr: impl Into<String>) -> ReaderBuilder {
        ReaderBuilder {
            addr: addr.into(),
            port: DEFAULT_PORT,
            connect_timeout: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Create a reader over a custom transport
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self::from_parts(Box::new(transport), DEFAULT_EVENT_CAPACITY)
    }

    fn from_parts(transport: Box<dyn Transport>, event_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                state: RwLock::new(ConnectionState::Disconnected),
                link: Mutex::new(None),
                next_link_id: AtomicU64::new(1),
                gate: EnrollmentGate::new(),
                events: EventBus::new(event_capacity),
                last_sent: Mutex::new(None),
            }),
        }
    }

    /// Subscribe to reader events
    pub fn subscribe(&self) -> broadcast::Receiver<ReaderEvent> {
        self.inner.events.subscribe()
    }

    /// Enrollment gate of this reader
    pub fn enrollment(&self) -> &EnrollmentGate {
        &self.inner.gate
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.read()
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    /// Device address as `host:port`
    pub fn remote_addr(&self) -> String {
        self.inner.transport.remote_addr()
    }

    /// Most recently written command
    pub fn last_sent(&self) -> Option<SendCommand> {
        self.inner.last_sent.lock().clone()
    }

    /// Connect to the reader
    ///
    /// Any previous connection is discarded first. The outcome is reported
    /// only through a [`ReaderEvent::ConnectionStateChanged`] event:
    /// `Connected` on success, `Closed` on failure.
    pub async fn connect(&self) {
        let inner = &self.inner;

        inner.discard_link().await;
        inner.set_state(ConnectionState::Connecting);

        info!("Connecting to SM25 reader {}...", inner.transport.remote_addr());

        match inner.transport.open().await {
            Ok(stream) => {
                inner.attach(stream);
                info!("SM25 reader {} connected", inner.transport.remote_addr());
            }
            Err(e) => {
                debug!(
                    "Error connecting to SM25 reader {}: {}",
                    inner.transport.remote_addr(),
                    e
                );
                inner.set_state(ConnectionState::Disconnected);
                inner
                    .events
                    .publish(ReaderEvent::ConnectionStateChanged(ConnectionStatus::Closed));
            }
        }
    }

    /// Close the connection
    ///
    /// Cancels a running enrollment first (best effort), stops the receive
    /// loop and releases the socket. Always publishes `Closed`; safe to call
    /// when already closed.
    pub async fn close(&self) {
        self.inner.close(None).await;
    }

    /// Write a command to the reader
    ///
    /// While an enrollment is active every command except the cancel command
    /// is ignored: nothing is written and its code is returned as if sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if there is no live connection, or an
    /// I/O error if the write fails.
    pub async fn send(&self, command: SendCommand) -> Result<Command> {
        self.inner.send(command).await
    }

    /// Test reachability with a throwaway connection
    ///
    /// Publishes `Connected` or `Closed` for the attempt and never touches
    /// the live connection.
    pub async fn probe(&self) -> bool {
        let inner = &self.inner;
        let attempt = timeout(Duration::from_secs(PROBE_TIMEOUT), inner.transport.open()).await;
        let reachable = matches!(attempt, Ok(Ok(_)));
        drop(attempt);

        debug!(
            "SM25 {} connection test {}",
            inner.transport.remote_addr(),
            reachable
        );

        let status = if reachable {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Closed
        };
        inner
            .events
            .publish(ReaderEvent::ConnectionStateChanged(status));

        reachable
    }
}

impl Inner {
    fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }

    fn is_connected(&self) -> bool {
        let connected = *self.state.read() == ConnectionState::Connected;
        connected && self.link.lock().is_some()
    }

    fn writer(&self) -> Option<Arc<tokio::sync::Mutex<BoxedWriter>>> {
        self.link.lock().as_ref().map(|link| Arc::clone(&link.writer))
    }

    /// Install a freshly opened stream and start its receive loop
    fn attach(self: &Arc<Self>, stream: Stream) {
        let id = self.next_link_id.fetch_add(1, Ordering::Relaxed);
        let (cancel, cancelled) = watch::channel(false);

        {
            let mut current = self.link.lock();
            *current = Some(Link {
                id,
                writer: Arc::new(tokio::sync::Mutex::new(stream.writer)),
                cancel,
            });
            self.set_state(ConnectionState::Connected);
        }
        self.events
            .publish(ReaderEvent::ConnectionStateChanged(ConnectionStatus::Connected));

        tokio::spawn(receive_loop(
            Arc::downgrade(self),
            id,
            stream.reader,
            cancelled,
            self.events.clone(),
        ));
    }

    /// Drop the current connection without publishing anything
    async fn discard_link(&self) {
        let link = self.link.lock().take();
        if let Some(link) = link {
            debug!("Discarding previous connection to {}", self.transport.remote_addr());
            link.shutdown().await;
        }
    }

    /// Close the current connection, or only connection `link_id` if given
    ///
    /// Everything after the link is taken acts on that link alone, so a
    /// connection attached meanwhile is left running.
    async fn close(&self, link_id: Option<u64>) {
        let link = {
            let mut current = self.link.lock();
            if let Some(id) = link_id {
                if !current.as_ref().is_some_and(|link| link.id == id) {
                    return;
                }
            }
            self.set_state(ConnectionState::Closing);
            current.take()
        };

        if let Some(link) = link {
            if self.gate.is_active() {
                debug!("Enrollment in progress, sending cancel before close");
                let cancel = self.write_command(&link.writer, SendCommand::cancel());
                match timeout(CLOSE_TIMEOUT, cancel).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => debug!("Cancel before close failed: {}", e),
                    Err(_) => debug!("Cancel before close timed out"),
                }
            }

            debug!("Closing SM25 reader {}", self.transport.remote_addr());
            link.shutdown().await;
        }

        {
            let current = self.link.lock();
            if current.is_some() {
                debug!("SM25 reader {} reconnected during close", self.transport.remote_addr());
                return;
            }
            self.set_state(ConnectionState::Disconnected);
        }

        self.gate.end();
        self.events
            .publish(ReaderEvent::ConnectionStateChanged(ConnectionStatus::Closed));

        debug!("Closed SM25 reader {}", self.transport.remote_addr());
    }

    async fn send(&self, command: SendCommand) -> Result<Command> {
        let code = command.command();

        if !self.gate.permits(&command) {
            debug!(
                "Command {} ignored. Expected enrollment to finish or a cancel command",
                code
            );
            return Ok(code);
        }

        let writer = self
            .writer()
            .filter(|_| self.is_connected())
            .ok_or_else(|| Error::NotConnected {
                addr: self.transport.remote_addr(),
                command: code,
            })?;

        self.write_command(&writer, command).await
    }

    /// Write `command` through `writer` and record it as sent
    async fn write_command(
        &self,
        writer: &tokio::sync::Mutex<BoxedWriter>,
        command: SendCommand,
    ) -> Result<Command> {
        let code = command.command();

        {
            let mut writer = writer.lock().await;
            trace!("Sending {}", command);
            writer.write_all(command.payload()).await?;
            writer.flush().await?;
        }

        self.events.publish(ReaderEvent::CommandSent(command.clone()));
        *self.last_sent.lock() = Some(command);

        Ok(code)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if self.link.get_mut().is_some() {
            warn!("SM25 reader dropped while still connected");
        }
    }
}

/// A lone zero byte between frames keeps an idle link alive
fn is_keepalive(chunk: &[u8], assembler: &FrameAssembler) -> bool {
    chunk == [KEEPALIVE_BYTE] && assembler.is_empty()
}

async fn receive_loop(
    inner: Weak<Inner>,
    link_id: u64,
    mut reader: BoxedReader,
    mut cancelled: watch::Receiver<bool>,
    events: EventBus,
) {
    let mut assembler = FrameAssembler::new();
    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);

    loop {
        if *cancelled.borrow() {
            debug!("Receive loop cancelled");
            return;
        }

        buf.clear();
        let read = tokio::select! {
            biased;
            _ = cancelled.changed() => {
                debug!("Receive loop cancelled");
                return;
            }
            read = reader.read_buf(&mut buf) => read,
        };

        match read {
            Ok(0) => {
                debug!("Connection closed by peer. Receive loop finished");
                break;
            }
            Ok(n) => {
                let chunk = &buf[..n];
                if is_keepalive(chunk, &assembler) {
                    trace!("Keep-alive received");
                    continue;
                }

                trace!("Received {} bytes: {:02X?}", n, &chunk[..n.min(32)]);

                for frame in assembler.push(chunk) {
                    trace!("Received frame {}", frame);
                    events.publish(ReaderEvent::FrameReceived(frame));
                }
            }
            Err(e) => {
                if *cancelled.borrow() {
                    debug!("Receive loop cancelled");
                    return;
                }
                debug!("Connection closed. Receive loop finished ({})", e);
                break;
            }
        }
    }

    if let Some(inner) = inner.upgrade() {
        inner.close(Some(link_id)).await;
    }
}
