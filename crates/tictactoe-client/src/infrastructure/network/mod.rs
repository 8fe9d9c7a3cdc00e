//! Network infrastructure for the client application.
//!
//! Finds the server on the LAN and opens the pub/sub link to it.
//!
//! Architecture:
//! - [`listen_for_server`] binds the discovery port and waits (bounded) for
//!   the first `broadcast/ server_info` datagram.  The port is bound with
//!   address reuse so several clients on one host can all listen.
//! - [`StreamLink`] owns the outbound stream (to `port_from_clients`) and a
//!   reader task on the inbound stream (from `port_to_clients`).  The reader
//!   pushes each decoded frame onto an `mpsc` queue that the session drains
//!   with a non-blocking poll.
//! - [`LanNetwork`] ties the two together behind the
//!   [`Network`] trait, optionally skipping discovery when the server address
//!   was given on the command line.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tictactoe_core::protocol::{decode_discovery_record, read_frame, write_frame};
use tictactoe_core::{DiscoveryRecord, FrameError};

use crate::application::play_session::{ClientConfig, ClientError, Network, ServerLink};

/// Inbound messages the reader task may queue ahead of the session.
const INBOUND_QUEUE_DEPTH: usize = 64;

/// Discovery datagrams are one short line.
const DISCOVERY_BUF_SIZE: usize = 512;

/// Listens on UDP `port` until a valid discovery record arrives or `wait`
/// elapses.
///
/// Datagrams that do not decode as a discovery record are ignored.
///
/// # Errors
///
/// - [`ClientError::DiscoveryBind`] if the port is unavailable.
/// - [`ClientError::DiscoveryTimeout`] if nothing valid arrives in time.
pub async fn listen_for_server(port: u16, wait: Duration) -> Result<DiscoveryRecord, ClientError> {
    let socket =
        bind_discovery_socket(port).map_err(|source| ClientError::DiscoveryBind { port, source })?;
    info!(port, ?wait, "listening for server announcements");

    let listen = async {
        let mut buf = [0u8; DISCOVERY_BUF_SIZE];
        loop {
            let (len, from) = match socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    warn!(error = %e, "discovery receive failed");
                    continue;
                }
            };
            let text = String::from_utf8_lossy(&buf[..len]);
            match decode_discovery_record(&text) {
                Ok(record) => {
                    debug!(%from, "discovery announcement received");
                    return record;
                }
                Err(e) => debug!(%from, error = %e, "ignoring datagram on discovery port"),
            }
        }
    };

    tokio::time::timeout(wait, listen)
        .await
        .map_err(|_| ClientError::DiscoveryTimeout(wait))
}

/// Binds UDP `port` on all interfaces, shareable with other listeners.
fn bind_discovery_socket(port: u16) -> std::io::Result<UdpSocket> {
    let addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, port).into();
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
    socket.set_reuse_port(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    UdpSocket::from_std(socket.into())
}

// ── Server link ───────────────────────────────────────────────────────────────

/// A link to the server over a pair of byte streams.
///
/// `W` carries `client/` frames to the server; a background task reads
/// `server/` frames from the other stream into a queue.
pub struct StreamLink<W> {
    writer: W,
    inbound: mpsc::Receiver<String>,
    reader: JoinHandle<()>,
}

/// The link used in production: two TCP connections.
pub type TcpServerLink = StreamLink<TcpStream>;

impl<W> StreamLink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Wraps an already-open pair of streams.
    pub fn new<R>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, inbound) = mpsc::channel(INBOUND_QUEUE_DEPTH);
        let reader = tokio::spawn(pump_frames(reader, tx));
        Self {
            writer,
            inbound,
            reader,
        }
    }
}

impl StreamLink<TcpStream> {
    /// Subscribes to `port_to_clients` and opens the publish stream to
    /// `port_from_clients`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConnectFailed`] naming whichever port refused.
    pub async fn connect(record: &DiscoveryRecord) -> Result<Self, ClientError> {
        let sub_addr = SocketAddr::new(record.server_address, record.port_to_clients);
        let pub_addr = SocketAddr::new(record.server_address, record.port_from_clients);

        let subscriber = TcpStream::connect(sub_addr)
            .await
            .map_err(|source| ClientError::ConnectFailed {
                addr: sub_addr,
                source,
            })?;
        let publisher = TcpStream::connect(pub_addr)
            .await
            .map_err(|source| ClientError::ConnectFailed {
                addr: pub_addr,
                source,
            })?;
        // Moves are tiny; don't let Nagle hold them back.
        if let Err(e) = publisher.set_nodelay(true) {
            debug!(error = %e, "could not disable Nagle on publish stream");
        }

        info!(%sub_addr, %pub_addr, "connected to server");
        Ok(Self::new(subscriber, publisher))
    }
}

impl<W> Drop for StreamLink<W> {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait]
impl<W> ServerLink for StreamLink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&mut self, text: &str) -> Result<(), ClientError> {
        write_frame(&mut self.writer, text).await?;
        Ok(())
    }

    fn try_recv(&mut self) -> Result<Option<String>, ClientError> {
        match self.inbound.try_recv() {
            Ok(text) => Ok(Some(text)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ClientError::ConnectionLost),
        }
    }
}

async fn pump_frames<R>(mut reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    loop {
        match read_frame(&mut reader).await {
            Ok(text) => {
                if tx.send(text).await.is_err() {
                    break;
                }
            }
            Err(FrameError::Closed) => {
                info!("server closed the connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "server stream failed");
                break;
            }
        }
    }
}

// ── Network ───────────────────────────────────────────────────────────────────

/// Discovery plus TCP connection on the local network.
pub struct LanNetwork {
    discovery_port: u16,
    discovery_timeout: Duration,
    server: Option<DiscoveryRecord>,
}

impl LanNetwork {
    /// Finds the server by listening for its UDP announcements.
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            discovery_port: config.discovery_port,
            discovery_timeout: config.discovery_timeout,
            server: None,
        }
    }

    /// Skips discovery and connects straight to `record`.
    pub fn with_server(config: &ClientConfig, record: DiscoveryRecord) -> Self {
        Self {
            server: Some(record),
            ..Self::new(config)
        }
    }
}

#[async_trait]
impl Network for LanNetwork {
    type Link = TcpServerLink;

    async fn discover(&mut self) -> Result<DiscoveryRecord, ClientError> {
        match self.server {
            Some(record) => {
                info!(server = %record.server_address, "using configured server address");
                Ok(record)
            }
            None => listen_for_server(self.discovery_port, self.discovery_timeout).await,
        }
    }

    async fn connect(&mut self, record: &DiscoveryRecord) -> Result<TcpServerLink, ClientError> {
        TcpServerLink::connect(record).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use tictactoe_core::protocol::encode_discovery_record;
    use tokio::net::TcpListener;

    fn frame(text: &str) -> Vec<u8> {
        let mut bytes = (text.len() as u32).to_be_bytes().to_vec();
        bytes.extend_from_slice(text.as_bytes());
        bytes
    }

    /// A UDP port nothing is bound to right now.
    async fn free_udp_port() -> u16 {
        let scratch = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        scratch.local_addr().unwrap().port()
    }

    /// Polls `try_recv` until something other than "empty" comes back.
    async fn next(link: &mut impl ServerLink) -> Result<String, ClientError> {
        for _ in 0..200 {
            if let Some(text) = link.try_recv()? {
                return Ok(text);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no message within 1s");
    }

    #[tokio::test]
    async fn test_link_queues_inbound_frames_in_order() {
        // Arrange
        let reader = tokio_test::io::Builder::new()
            .read(&frame("server/ joined alice"))
            .read(&frame("server/ turn alice"))
            .build();
        let writer = tokio_test::io::Builder::new().build();
        let mut link = StreamLink::new(reader, writer);

        // Act / Assert
        assert_eq!(next(&mut link).await.unwrap(), "server/ joined alice");
        assert_eq!(next(&mut link).await.unwrap(), "server/ turn alice");
        assert!(matches!(next(&mut link).await, Err(ClientError::ConnectionLost)));
    }

    #[tokio::test]
    async fn test_link_send_writes_one_frame() {
        // Arrange
        let reader = tokio_test::io::Builder::new()
            .wait(Duration::from_secs(1))
            .build();
        let writer = tokio_test::io::Builder::new()
            .write(&frame("client/ request join alice"))
            .build();
        let mut link = StreamLink::new(reader, writer);

        // Act
        let result = link.send("client/ request join alice").await;

        // Assert: the writer mock verifies the bytes when dropped.
        assert!(result.is_ok());
        assert_eq!(link.try_recv().unwrap(), None);
    }

    #[tokio::test]
    async fn test_link_reports_loss_after_oversized_frame() {
        let header = 1_000_000u32.to_be_bytes();
        let reader = tokio_test::io::Builder::new().read(&header).build();
        let writer = tokio_test::io::Builder::new().build();
        let mut link = StreamLink::new(reader, writer);

        assert!(matches!(next(&mut link).await, Err(ClientError::ConnectionLost)));
    }

    #[tokio::test]
    async fn test_connect_reaches_both_ports() {
        // Arrange
        let subs = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let pubs = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let record = DiscoveryRecord {
            server_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port_to_clients: subs.local_addr().unwrap().port(),
            port_from_clients: pubs.local_addr().unwrap().port(),
        };

        // Act
        let mut link = TcpServerLink::connect(&record).await.unwrap();
        let (mut sub_side, _) = subs.accept().await.unwrap();
        let (mut pub_side, _) = pubs.accept().await.unwrap();
        write_frame(&mut sub_side, "server/ draw").await.unwrap();
        link.send("client/ resign alice").await.unwrap();

        // Assert
        assert_eq!(next(&mut link).await.unwrap(), "server/ draw");
        assert_eq!(read_frame(&mut pub_side).await.unwrap(), "client/ resign alice");
    }

    #[tokio::test]
    async fn test_connect_refused_names_the_port() {
        // Bind then drop to get a port that is (almost certainly) closed.
        let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = closed.local_addr().unwrap().port();
        drop(closed);
        let record = DiscoveryRecord {
            server_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port_to_clients: port,
            port_from_clients: port,
        };

        let result = TcpServerLink::connect(&record).await;

        match result {
            Err(ClientError::ConnectFailed { addr, .. }) => assert_eq!(addr.port(), port),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("connect should fail"),
        }
    }

    #[tokio::test]
    async fn test_listen_for_server_ignores_noise_and_returns_record() {
        // Arrange: pick a free UDP port for the listener.
        let port = free_udp_port().await;
        let record = DiscoveryRecord {
            server_address: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)),
            port_to_clients: 5000,
            port_from_clients: 5001,
        };
        let listener = tokio::spawn(listen_for_server(port, Duration::from_secs(2)));
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        // Act: keep sending until the listener has bound and answered.
        let target: SocketAddr = (Ipv4Addr::LOCALHOST, port).into();
        let payload = encode_discovery_record(&record);
        for _ in 0..40 {
            sender.send_to(b"hello", target).await.unwrap();
            sender.send_to(payload.as_bytes(), target).await.unwrap();
            if listener.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }

        // Assert
        assert_eq!(listener.await.unwrap().unwrap(), record);
    }

    #[tokio::test]
    async fn test_listen_for_server_times_out() {
        let port = free_udp_port().await;

        let result = listen_for_server(port, Duration::from_millis(50)).await;

        assert!(matches!(result, Err(ClientError::DiscoveryTimeout(_))));
    }

    #[tokio::test]
    async fn test_two_clients_on_one_host_share_the_discovery_port() {
        // Arrange
        let port = free_udp_port().await;
        let wait = Duration::from_millis(200);

        // Act: both listeners hold the port at the same time.
        let (first, second) = tokio::join!(
            listen_for_server(port, wait),
            listen_for_server(port, wait)
        );

        // Assert: neither failed to bind; both simply heard nothing.
        assert!(matches!(first, Err(ClientError::DiscoveryTimeout(_))), "{first:?}");
        assert!(matches!(second, Err(ClientError::DiscoveryTimeout(_))), "{second:?}");
    }

    #[tokio::test]
    async fn test_discovery_socket_binds_next_to_an_existing_listener() {
        // Arrange: another client already owns the port.
        let port = free_udp_port().await;
        let _other = bind_discovery_socket(port).unwrap();

        // Act
        let ours = bind_discovery_socket(port);

        // Assert
        let ours = ours.unwrap();
        assert_eq!(ours.local_addr().unwrap().port(), port);
    }

    #[tokio::test]
    async fn test_lan_network_with_server_skips_discovery() {
        let record = DiscoveryRecord::with_default_ports(IpAddr::V4(Ipv4Addr::new(192, 168, 0, 9)));
        let mut network = LanNetwork::with_server(&ClientConfig::default(), record);

        assert_eq!(network.discover().await.unwrap(), record);
    }
}
