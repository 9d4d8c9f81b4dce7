//! Switch lifecycle management: start and stop.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use super::{Switch, SwitchError, SwitchState};
use crate::transport::{packet_channel, PortId, UdpPort};

impl Switch {
    /// Start the switch.
    ///
    /// Creates the frame channel and binds every configured port. If any
    /// port fails to start, the ports already bound are stopped again and
    /// the error is returned.
    pub async fn start(&mut self) -> Result<(), SwitchError> {
        if !self.state.can_start() {
            return Err(SwitchError::AlreadyStarted);
        }
        self.state = SwitchState::Starting;

        let (packet_tx, packet_rx) = packet_channel(self.config.node.packet_channel);

        let mut ports = BTreeMap::new();
        for port_config in &self.config.ports {
            let mut port = UdpPort::new(port_config.clone(), packet_tx.clone());
            if let Err(source) = port.start_async().await {
                warn!(port = port_config.id, error = %source, "Port failed to start");
                stop_ports(&mut ports).await;
                self.state = SwitchState::Stopped;
                return Err(SwitchError::Port {
                    port: port_config.id,
                    source,
                });
            }
            ports.insert(port.id(), port);
        }

        self.ports = ports;
        self.packet_tx = Some(packet_tx);
        self.packet_rx = Some(packet_rx);
        self.state = SwitchState::Running;

        info!(
            switch = %self.identity(),
            ports = self.ports.len(),
            routes = self.forwarding.len(),
            capacity = self.engine.cache().capacity(),
            "Switch started"
        );

        Ok(())
    }

    /// Stop the switch.
    ///
    /// Stops every port and drops the frame channel, which ends the receive
    /// loop if it is still running.
    pub async fn stop(&mut self) -> Result<(), SwitchError> {
        if !self.state.can_stop() {
            return Err(SwitchError::NotStarted);
        }
        self.state = SwitchState::Stopping;
        info!(state = %self.state, "Switch stopping");

        stop_ports(&mut self.ports).await;

        self.packet_tx.take();
        self.packet_rx.take();

        let stats = self.engine.stats();
        info!(
            processed = stats.processed,
            malformed = stats.malformed,
            hits = stats.hits,
            misses = stats.misses,
            misdeliveries = stats.misdeliveries,
            "Switch stopped"
        );

        self.state = SwitchState::Stopped;
        Ok(())
    }
}

/// Stop and remove every port, logging failures.
async fn stop_ports(ports: &mut BTreeMap<PortId, UdpPort>) {
    for (id, mut port) in std::mem::take(ports) {
        match port.stop_async().await {
            Ok(()) => debug!(port = id, "Port stopped"),
            Err(e) => warn!(port = id, error = %e, "Port stop failed"),
        }
    }
}
