//! UDP broadcast announcement of the server's address.
//!
//! The server sends one datagram every interval (default 1 s) to the LAN
//! broadcast address on the discovery port (default 41110):
//!
//! ```text
//! broadcast/ server_info <ip> <port_to_clients> <port_from_clients>
//! ```
//!
//! Clients listen on that port, decode the first announcement they hear, and
//! connect to the advertised ports.
//!
//! # How UDP discovery works (for beginners)
//!
//! UDP is connectionless and does not guarantee delivery.  That suits
//! discovery: a lost announcement costs nothing because another one follows a
//! second later.  Sending to `255.255.255.255` delivers the datagram to every
//! host on the local segment, which is how a client finds the server without
//! knowing its IP address in advance.
//!
//! # Lifecycle
//!
//! The broadcaster is a background task that only reads the immutable
//! [`DiscoveryRecord`]; it never touches the game.  Send failures are logged
//! and retried on the next tick.  [`DiscoveryBroadcaster::cancel`] (or dropping
//! the handle) signals the task to stop without waiting for it.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket as StdUdpSocket};
use std::time::Duration;

use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use tictactoe_core::protocol::encode_discovery_record;
use tictactoe_core::DiscoveryRecord;

/// Error type for discovery service operations.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The UDP socket could not be bound.
    #[error("failed to bind discovery socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Broadcasting could not be enabled on the socket.
    #[error("failed to enable broadcast: {0}")]
    Broadcast(std::io::Error),
}

/// Handle to the running announcement task.
pub struct DiscoveryBroadcaster {
    cancel: oneshot::Sender<()>,
}

impl DiscoveryBroadcaster {
    /// Binds an ephemeral UDP socket and starts announcing `record` to
    /// `target` every `interval`.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] if the socket cannot be prepared.  Failures
    /// after start-up are never reported; they are logged and retried.
    pub async fn start(
        record: DiscoveryRecord,
        target: SocketAddr,
        interval: Duration,
    ) -> Result<Self, DiscoveryError> {
        let addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, 0).into();
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| DiscoveryError::BindFailed { addr, source })?;
        socket
            .set_broadcast(true)
            .map_err(DiscoveryError::Broadcast)?;

        let payload = encode_discovery_record(&record);
        let (cancel, cancelled) = oneshot::channel();
        tokio::spawn(announce_loop(socket, payload, target, interval, cancelled));

        info!(%target, ?interval, server = %record.server_address, "discovery broadcaster started");
        Ok(Self { cancel })
    }

    /// Signals the task to stop.  Does not wait for it to finish.
    pub fn cancel(self) {
        let _ = self.cancel.send(());
    }
}

async fn announce_loop(
    socket: UdpSocket,
    payload: String,
    target: SocketAddr,
    period: Duration,
    mut cancelled: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = &mut cancelled => break,
            _ = ticker.tick() => {
                match socket.send_to(payload.as_bytes(), target).await {
                    Ok(_) => debug!(%target, "discovery announcement sent"),
                    Err(e) => warn!(%target, error = %e, "discovery send failed, retrying next tick"),
                }
            }
        }
    }
    info!("discovery broadcaster stopped");
}

/// Best guess at the address other LAN hosts can reach this machine on.
///
/// "Connecting" a UDP socket sends no packets but makes the OS pick the
/// outbound interface, whose address is then read back.  Falls back to
/// `127.0.0.1` when there is no route (e.g. offline machines).
pub fn local_ip() -> IpAddr {
    StdUdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .and_then(|socket| {
            socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
            socket.local_addr()
        })
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tictactoe_core::protocol::decode_discovery_record;

    fn record() -> DiscoveryRecord {
        DiscoveryRecord {
            server_address: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
            port_to_clients: 41111,
            port_from_clients: 41112,
        }
    }

    #[tokio::test]
    async fn test_broadcaster_sends_record_repeatedly() {
        // Arrange: announce to a loopback listener instead of the broadcast address.
        let listener = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap();
        let broadcaster = DiscoveryBroadcaster::start(record(), target, Duration::from_millis(20))
            .await
            .unwrap();

        // Act
        let mut buf = [0u8; 256];
        let mut received = Vec::new();
        for _ in 0..2 {
            let (len, _) = tokio::time::timeout(Duration::from_secs(2), listener.recv_from(&mut buf))
                .await
                .expect("announcement within timeout")
                .unwrap();
            received.push(String::from_utf8_lossy(&buf[..len]).into_owned());
        }
        broadcaster.cancel();

        // Assert
        for text in &received {
            assert_eq!(
                text,
                "broadcast/ server_info 192.168.1.20 41111 41112"
            );
            assert_eq!(decode_discovery_record(text).unwrap(), record());
        }
    }

    #[tokio::test]
    async fn test_cancel_stops_announcements() {
        // Arrange
        let listener = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap();
        let broadcaster = DiscoveryBroadcaster::start(record(), target, Duration::from_millis(10))
            .await
            .unwrap();
        let mut buf = [0u8; 256];
        listener.recv_from(&mut buf).await.unwrap();

        // Act
        broadcaster.cancel();
        tokio::time::sleep(Duration::from_millis(50)).await;
        // Drain anything sent before the cancel was observed.
        while let Ok(Ok(_)) =
            tokio::time::timeout(Duration::from_millis(5), listener.recv_from(&mut buf)).await
        {}

        // Assert
        let late = tokio::time::timeout(Duration::from_millis(100), listener.recv_from(&mut buf)).await;
        assert!(late.is_err(), "no announcement after cancel");
    }

    #[tokio::test]
    async fn test_send_failure_does_not_stop_broadcaster() {
        // Port 0 is not a valid destination; every send fails.
        let target: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let broadcaster = DiscoveryBroadcaster::start(record(), target, Duration::from_millis(5))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        // Still running: the cancel channel's receiver is alive.
        assert!(!broadcaster.cancel.is_closed());
        broadcaster.cancel();
    }

    #[test]
    fn test_local_ip_is_never_unspecified() {
        let ip = local_ip();
        assert!(!ip.is_unspecified());
    }
}
