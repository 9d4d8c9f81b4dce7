//! Switch Port Transport
//!
//! Each switch port is a point-to-point link to one neighbour (a host, a
//! switch in the next tier, or a gateway). Ports deliver received frames to
//! the switch over a shared channel, tagged with the receiving port so the
//! engine knows the ingress class.

pub mod udp;

use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

use thiserror::Error;

pub use udp::UdpPort;

/// Switch-local port number.
pub type PortId = u8;

// ============================================================================
// Frame Channel Types
// ============================================================================

/// A frame received on a port.
#[derive(Clone, Debug)]
pub struct ReceivedFrame {
    /// Which port received this frame.
    pub port: PortId,
    /// Sender's socket address.
    pub remote_addr: SocketAddr,
    /// Raw frame bytes.
    pub data: Vec<u8>,
    /// Receipt time.
    pub received_at: Instant,
}

impl ReceivedFrame {
    /// Create a received frame stamped with the current time.
    pub fn new(port: PortId, remote_addr: SocketAddr, data: Vec<u8>) -> Self {
        Self::with_timestamp(port, remote_addr, data, Instant::now())
    }

    /// Create a received frame with an explicit receipt time.
    pub fn with_timestamp(
        port: PortId,
        remote_addr: SocketAddr,
        data: Vec<u8>,
        received_at: Instant,
    ) -> Self {
        Self {
            port,
            remote_addr,
            data,
            received_at,
        }
    }
}

/// Channel sender for received frames.
pub type PacketTx = tokio::sync::mpsc::Sender<ReceivedFrame>;

/// Channel receiver for received frames.
pub type PacketRx = tokio::sync::mpsc::Receiver<ReceivedFrame>;

/// Create a frame channel with the given buffer size.
pub fn packet_channel(buffer: usize) -> (PacketTx, PacketRx) {
    tokio::sync::mpsc::channel(buffer)
}

// ============================================================================
// Errors
// ============================================================================

/// Errors related to port operations.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("port not started")]
    NotStarted,

    #[error("port already started")]
    AlreadyStarted,

    #[error("port failed to start: {0}")]
    StartFailed(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("invalid port address: {0}")]
    InvalidAddress(String),

    #[error("mtu exceeded: frame {frame_size} > mtu {mtu}")]
    MtuExceeded { frame_size: usize, mtu: u16 },
}

// ============================================================================
// Port State
// ============================================================================

/// Port lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PortState {
    /// Configured but not started.
    #[default]
    Configured,
    /// Bind in progress.
    Starting,
    /// Socket bound, receive loop running.
    Up,
    /// Was up, now stopped.
    Down,
    /// Failed to start.
    Failed,
}

impl PortState {
    /// Check if the port can carry frames.
    pub fn is_operational(&self) -> bool {
        matches!(self, PortState::Up)
    }

    /// Check if the port can be started.
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            PortState::Configured | PortState::Down | PortState::Failed
        )
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PortState::Configured => "configured",
            PortState::Starting => "starting",
            PortState::Up => "up",
            PortState::Down => "down",
            PortState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_state_transitions() {
        assert!(PortState::Configured.can_start());
        assert!(PortState::Down.can_start());
        assert!(PortState::Failed.can_start());
        assert!(!PortState::Starting.can_start());
        assert!(!PortState::Up.can_start());

        assert!(PortState::Up.is_operational());
        assert!(!PortState::Down.is_operational());
    }

    #[test]
    fn test_port_state_display() {
        assert_eq!(PortState::Configured.to_string(), "configured");
        assert_eq!(PortState::Up.to_string(), "up");
        assert_eq!(PortState::Failed.to_string(), "failed");
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::MtuExceeded {
            frame_size: 2000,
            mtu: 1500,
        };
        assert_eq!(err.to_string(), "mtu exceeded: frame 2000 > mtu 1500");
    }

    #[tokio::test]
    async fn test_packet_channel() {
        let (tx, mut rx) = packet_channel(4);
        let remote: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        tx.send(ReceivedFrame::new(3, remote, vec![1, 2, 3]))
            .await
            .unwrap();

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.port, 3);
        assert_eq!(frame.remote_addr, remote);
        assert_eq!(frame.data, vec![1, 2, 3]);
    }
}
