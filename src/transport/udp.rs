//! UDP Port Implementation
//!
//! Emulates one switch port over a UDP socket: frames arriving on the bound
//! socket are delivered to the switch, frames sent on the port go to the
//! configured peer.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{PacketTx, PortId, PortState, ReceivedFrame, TransportError};
use crate::config::PortConfig;
use crate::engine::PortClass;

/// A switch port backed by a UDP socket.
pub struct UdpPort {
    /// Configuration (id, class, addresses).
    config: PortConfig,
    /// Current state.
    state: PortState,
    /// Bound socket (None until started).
    socket: Option<Arc<UdpSocket>>,
    /// Parsed peer address (set on start).
    peer_addr: Option<SocketAddr>,
    /// Channel for delivering received frames to the switch.
    packet_tx: PacketTx,
    /// Receive loop task handle.
    recv_task: Option<JoinHandle<()>>,
    /// Local bound address (after start).
    local_addr: Option<SocketAddr>,
}

impl UdpPort {
    /// Create a new port.
    pub fn new(config: PortConfig, packet_tx: PacketTx) -> Self {
        Self {
            config,
            state: PortState::Configured,
            socket: None,
            peer_addr: None,
            packet_tx,
            recv_task: None,
            local_addr: None,
        }
    }

    pub fn id(&self) -> PortId {
        self.config.id
    }

    pub fn class(&self) -> PortClass {
        self.config.class
    }

    pub fn state(&self) -> PortState {
        self.state
    }

    pub fn mtu(&self) -> u16 {
        self.config.mtu()
    }

    /// Get the local bound address (only valid after start).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Get the peer address (only valid after start).
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Start the port asynchronously.
    ///
    /// Binds the UDP socket and spawns the receive loop.
    pub async fn start_async(&mut self) -> Result<(), TransportError> {
        if !self.state.can_start() {
            return Err(TransportError::AlreadyStarted);
        }

        self.state = PortState::Starting;
        match self.bind().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.state = PortState::Failed;
                Err(e)
            }
        }
    }

    async fn bind(&mut self) -> Result<(), TransportError> {
        let bind_addr = parse_socket_addr(&self.config.bind_addr)?;
        let peer_addr = parse_socket_addr(&self.config.peer_addr)?;

        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| TransportError::StartFailed(format!("bind failed: {}", e)))?;
        let local_addr = socket
            .local_addr()
            .map_err(|e| TransportError::StartFailed(format!("get local addr: {}", e)))?;

        let socket = Arc::new(socket);
        self.socket = Some(socket.clone());
        self.local_addr = Some(local_addr);
        self.peer_addr = Some(peer_addr);

        let port = self.config.id;
        let packet_tx = self.packet_tx.clone();
        let mtu = self.config.mtu();

        self.recv_task = Some(tokio::spawn(async move {
            udp_receive_loop(socket, port, packet_tx, mtu).await;
        }));
        self.state = PortState::Up;

        info!(
            port = port,
            class = %self.config.class,
            local_addr = %local_addr,
            peer_addr = %peer_addr,
            "Port up"
        );

        Ok(())
    }

    /// Stop the port asynchronously.
    pub async fn stop_async(&mut self) -> Result<(), TransportError> {
        if !self.state.is_operational() {
            return Err(TransportError::NotStarted);
        }

        if let Some(task) = self.recv_task.take() {
            task.abort();
            let _ = task.await; // Ignore JoinError from abort
        }

        self.socket.take();
        self.local_addr = None;
        self.state = PortState::Down;

        debug!(port = self.config.id, "Port down");

        Ok(())
    }

    /// Send a frame to the port's peer.
    pub async fn send_async(&self, data: &[u8]) -> Result<usize, TransportError> {
        if !self.state.is_operational() {
            return Err(TransportError::NotStarted);
        }

        let mtu = self.config.mtu();
        if data.len() > mtu as usize {
            return Err(TransportError::MtuExceeded {
                frame_size: data.len(),
                mtu,
            });
        }

        let socket = self.socket.as_ref().ok_or(TransportError::NotStarted)?;
        let peer_addr = self.peer_addr.ok_or(TransportError::NotStarted)?;

        let bytes_sent = socket
            .send_to(data, peer_addr)
            .await
            .map_err(|e| TransportError::SendFailed(format!("{}", e)))?;

        debug!(
            port = self.config.id,
            peer_addr = %peer_addr,
            bytes = bytes_sent,
            "Frame sent"
        );

        Ok(bytes_sent)
    }
}

/// Parse a configured address string.
fn parse_socket_addr(addr: &str) -> Result<SocketAddr, TransportError> {
    addr.parse()
        .map_err(|e| TransportError::InvalidAddress(format!("'{}': {}", addr, e)))
}

/// UDP receive loop - runs as a spawned task.
async fn udp_receive_loop(socket: Arc<UdpSocket>, port: PortId, packet_tx: PacketTx, mtu: u16) {
    // Headroom so oversized frames are delivered and rejected by the decoder
    let mut buf = vec![0u8; mtu as usize + 100];

    debug!(port = port, "Port receive loop starting");

    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, remote_addr)) => {
                let frame = ReceivedFrame::new(port, remote_addr, buf[..len].to_vec());

                debug!(
                    port = port,
                    remote_addr = %remote_addr,
                    bytes = len,
                    "Frame received"
                );

                if packet_tx.send(frame).await.is_err() {
                    info!(port = port, "Frame channel closed, stopping receive loop");
                    break;
                }
            }
            Err(e) => {
                // Transient (e.g. ICMP port unreachable surfaced on Linux)
                warn!(port = port, error = %e, "Port receive error");
            }
        }
    }

    debug!(port = port, "Port receive loop stopped");
}

// ============================================================================
// Tests
// ============================================================================
