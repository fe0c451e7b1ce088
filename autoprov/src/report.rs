//! Operator status reporting over UDP multicast.
//!
//! Fire-and-forget by contract: one raw-text datagram per status, no
//! framing, no acknowledgment, no retry. This is an operator-visibility
//! side channel, not a control plane, so a failed send is logged locally
//! and never surfaced to the caller.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::{info, warn};

/// Destination for status messages.
///
/// The monitor only needs this seam; tests substitute a recording sink.
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// Emit one status message. Must never fail.
    async fn report(&self, text: &str, success: bool);
}

/// [`StatusSink`] that sends each message as a single datagram to a
/// multicast group, so field operators get status without a terminal.
pub struct StatusReporter {
    group: SocketAddrV4,
}

impl StatusReporter {
    pub fn new(group: Ipv4Addr, port: u16) -> Self {
        Self {
            group: SocketAddrV4::new(group, port),
        }
    }

    async fn send(&self, text: &str) -> io::Result<()> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.join_multicast_v4(*self.group.ip(), Ipv4Addr::UNSPECIFIED)?;
        socket
            .send_to(text.as_bytes(), SocketAddr::V4(self.group))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl StatusSink for StatusReporter {
    async fn report(&self, text: &str, success: bool) {
        if success {
            info!(status = %text, "reporting");
        } else {
            warn!(status = %text, "reporting failure");
        }
        if let Err(e) = self.send(text).await {
            warn!(group = %self.group, error = %e, "status datagram not sent");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_report_never_fails() {
        // Delivery is best-effort; report must swallow any socket error.
        let reporter = StatusReporter::new(Ipv4Addr::new(235, 0, 0, 1), 4444);
        reporter.report("Mounted TASKKEY at /dev/sdb1", true).await;
        reporter.report("Failed to compile task.", false).await;
    }

    #[tokio::test]
    async fn test_datagram_carries_raw_text() {
        // Loop the datagram back through the group on the loopback
        // interface; skip silently if the sandbox forbids multicast.
        let group = Ipv4Addr::new(235, 0, 0, 1);
        let Ok(receiver) = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await else {
            return;
        };
        if receiver.join_multicast_v4(group, Ipv4Addr::LOCALHOST).is_err() {
            return;
        }
        let port = receiver.local_addr().unwrap().port();

        let reporter = StatusReporter::new(group, port);
        reporter.report("hello operators", true).await;

        let mut buf = [0u8; 64];
        let recv =
            tokio::time::timeout(std::time::Duration::from_secs(1), receiver.recv_from(&mut buf));
        if let Ok(Ok((len, _))) = recv.await {
            assert_eq!(&buf[..len], b"hello operators");
        }
    }
}
