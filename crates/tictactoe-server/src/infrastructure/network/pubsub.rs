//! Publish/subscribe transport over TCP.
//!
//! Two listeners make up the server side of the transport:
//!
//! - [`Publisher`] accepts *subscribers* on `port_to_clients`.  Every message
//!   published after a subscriber connects is written to it, in order.
//!   Fan-out uses a `tokio::sync::broadcast` channel with one receiver per
//!   subscriber connection.
//! - [`Collector`] accepts *publishers* (the clients) on `port_from_clients`.
//!   Frames from every connection are funnelled into one `mpsc` queue, which
//!   the arbitration loop drains one message at a time.
//!
//! Each message is one length-prefixed frame (see `tictactoe_core::protocol::frame`).
//! Topic filtering is the codec's job.  The collector only peeks at each
//! frame to remember who spoke on a connection, so a hang-up can be pinned
//! on a player.
//!
//! Connection loss is reported, never swallowed: a failed subscriber is
//! surfaced by the next [`Publisher::send`], a closed client connection
//! arrives in the inbox as [`Inbound::Hangup`].

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use tictactoe_core::protocol::{
    decode_client_message, encode_server_message, read_frame, write_frame, ProtocolError,
};
use tictactoe_core::ServerMessage;

use crate::application::run_session::{Inbound, MessageInbox, MessagePublisher, PublishError};

/// Messages buffered per subscriber before it is considered lagging.
const FANOUT_CAPACITY: usize = 64;

/// Inbound messages buffered before client readers apply back-pressure.
const INBOX_CAPACITY: usize = 64;

/// How long [`Publisher::shutdown`] waits for subscribers to drain.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors raised by the server-side transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[from] ProtocolError),

    #[error("subscriber {peer} connection lost")]
    SubscriberLost { peer: SocketAddr },
}

impl From<TransportError> for PublishError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::SubscriberLost { peer } => PublishError::SubscriberLost { peer },
            TransportError::Encode(e) => PublishError::Encode(e),
            TransportError::Io(e) | TransportError::Bind { source: e, .. } => PublishError::Io(e),
        }
    }
}

/// First subscriber failure not yet reported by [`Publisher::send`].
type LostSlot = Arc<Mutex<Option<SocketAddr>>>;

async fn bind(addr: SocketAddr) -> Result<(TcpListener, SocketAddr), TransportError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| TransportError::Bind { addr, source })?;
    let local_addr = listener.local_addr()?;
    Ok((listener, local_addr))
}

// ── Publisher ─────────────────────────────────────────────────────────────────

/// Server → clients fan-out.
pub struct Publisher {
    tx: broadcast::Sender<String>,
    lost: LostSlot,
    local_addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Publisher {
    /// Binds the subscriber listener and starts accepting connections.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Bind`] if the address is unavailable.
    pub async fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        let (listener, local_addr) = bind(addr).await?;
        let (tx, _) = broadcast::channel(FANOUT_CAPACITY);
        let (stop, stop_rx) = oneshot::channel();
        let lost = LostSlot::default();
        let task = tokio::spawn(accept_subscribers(
            listener,
            tx.clone(),
            Arc::clone(&lost),
            stop_rx,
        ));
        info!(addr = %local_addr, "publisher listening");
        Ok(Self {
            tx,
            lost,
            local_addr,
            stop,
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of currently connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Encodes `msg` and queues it for every connected subscriber.
    ///
    /// Publishing with no subscribers succeeds; the message is simply lost,
    /// as with any pub/sub transport.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Encode`] if `msg` cannot be encoded.
    /// - [`TransportError::SubscriberLost`] if a subscriber connection failed
    ///   since the previous call.  `msg` is still queued for the others, and
    ///   each failure is reported once.
    pub fn send(&self, msg: &ServerMessage) -> Result<(), TransportError> {
        let text = encode_server_message(msg)?;
        match self.tx.send(text) {
            Ok(n) => debug!(subscribers = n, ?msg, "published"),
            Err(_) => debug!(?msg, "published with no subscribers"),
        }
        match take_lost(&self.lost) {
            Some(peer) => Err(TransportError::SubscriberLost { peer }),
            None => Ok(()),
        }
    }

    /// Stops accepting subscribers and waits (bounded) until every queued
    /// message has been written out.
    pub async fn shutdown(self) {
        let Publisher { tx, stop, task, .. } = self;
        drop(tx);
        let _ = stop.send(());
        if tokio::time::timeout(DRAIN_TIMEOUT, task).await.is_err() {
            warn!("subscribers did not drain in time");
        }
    }
}

#[async_trait]
impl MessagePublisher for Publisher {
    async fn publish(&self, msg: &ServerMessage) -> Result<(), PublishError> {
        Ok(self.send(msg)?)
    }
}

fn take_lost(slot: &LostSlot) -> Option<SocketAddr> {
    slot.lock().ok().and_then(|mut lost| lost.take())
}

fn record_lost(slot: &LostSlot, peer: SocketAddr) {
    if let Ok(mut lost) = slot.lock() {
        lost.get_or_insert(peer);
    }
}

async fn accept_subscribers(
    listener: TcpListener,
    tx: broadcast::Sender<String>,
    lost: LostSlot,
    mut stop: oneshot::Receiver<()>,
) {
    let mut writers = JoinSet::new();
    loop {
        tokio::select! {
            _ = &mut stop => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "subscriber connected");
                    writers.spawn(serve_subscriber(stream, peer, tx.subscribe(), Arc::clone(&lost)));
                }
                Err(e) => warn!(error = %e, "accept failed on publisher"),
            },
        }
    }
    // Once every sender is gone the writers see `Closed` after draining.
    drop(tx);
    while writers.join_next().await.is_some() {}
}

/// Writes every broadcast message to one subscriber.
///
/// Subscribers never send, so any read completing means the peer closed or
/// reset the connection.  Either that or a failed write is recorded in
/// `lost`.
async fn serve_subscriber(
    mut stream: TcpStream,
    peer: SocketAddr,
    mut rx: broadcast::Receiver<String>,
    lost: LostSlot,
) {
    let (mut reader, mut writer) = stream.split();
    let mut scratch = [0u8; 64];
    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(text) => {
                    if let Err(e) = write_frame(&mut writer, &text).await {
                        warn!(%peer, error = %e, "subscriber write failed");
                        record_lost(&lost, peer);
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(%peer, skipped, "subscriber lagging, messages dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            read = reader.read(&mut scratch) => match read {
                Ok(0) | Err(_) => {
                    debug!(%peer, "subscriber disconnected");
                    record_lost(&lost, peer);
                    return;
                }
                Ok(n) => debug!(%peer, bytes = n, "ignoring bytes from subscriber"),
            },
        }
    }
    let _ = writer.shutdown().await;
}

// ── Collector ─────────────────────────────────────────────────────────────────

/// Clients → server funnel.
pub struct Collector {
    rx: mpsc::Receiver<Inbound>,
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl Collector {
    /// Binds the client listener and starts accepting connections.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Bind`] if the address is unavailable.
    pub async fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        let (listener, local_addr) = bind(addr).await?;
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        let task = tokio::spawn(accept_publishers(listener, tx));
        info!(addr = %local_addr, "collector listening");
        Ok(Self {
            rx,
            local_addr,
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Next event from any connected client, in arrival order.
    pub async fn recv(&mut self) -> Option<Inbound> {
        self.rx.recv().await
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        // Dropping the JoinSet inside the task aborts every reader.
        self.task.abort();
    }
}

#[async_trait]
impl MessageInbox for Collector {
    async fn next_event(&mut self) -> Option<Inbound> {
        self.recv().await
    }
}

async fn accept_publishers(listener: TcpListener, tx: mpsc::Sender<Inbound>) {
    let mut readers = JoinSet::new();
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(%peer, "client connected");
                readers.spawn(read_client(stream, peer, tx.clone()));
            }
            Err(e) => warn!(error = %e, "accept failed on collector"),
        }
        // Reap finished readers so the set does not grow without bound.
        while readers.try_join_next().is_some() {}
    }
}

async fn read_client(mut stream: TcpStream, peer: SocketAddr, tx: mpsc::Sender<Inbound>) {
    let mut username = None;
    loop {
        match read_frame(&mut stream).await {
            Ok(text) => {
                if let Ok(msg) = decode_client_message(&text) {
                    username = Some(msg.username().to_string());
                }
                if tx.send(Inbound::Message(text)).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                debug!(%peer, ?username, error = %e, "client stream ended");
                let _ = tx.send(Inbound::Hangup { username }).await;
                return;
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
