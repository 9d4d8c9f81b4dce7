//! RX event loop and egress.

use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use super::{Switch, SwitchError};
use crate::engine::Output;
use crate::transport::ReceivedFrame;

impl Switch {
    /// Run the receive event loop.
    ///
    /// Processes frames from all ports in arrival order and sends every
    /// resulting packet out its egress port. A periodic tick drops expired
    /// pending invalidations.
    ///
    /// This method takes ownership of the frame channel and runs until the
    /// channel is closed. Callers that need to shut down while it runs
    /// select on it against their shutdown signal.
    pub async fn run_rx_loop(&mut self) -> Result<(), SwitchError> {
        let mut packet_rx = self.packet_rx.take().ok_or(SwitchError::NotStarted)?;

        let mut tick =
            tokio::time::interval(Duration::from_millis(self.config.node.tick_interval_ms));

        info!("RX event loop started");

        loop {
            tokio::select! {
                frame = packet_rx.recv() => {
                    match frame {
                        Some(f) => self.process_frame(f).await,
                        None => break, // channel closed
                    }
                }
                _ = tick.tick() => {
                    let purged = self.engine.purge_expired(Instant::now());
                    if purged > 0 {
                        trace!(purged, "Expired pending invalidations");
                    }
                }
            }
        }

        info!("RX event loop stopped (channel closed)");
        Ok(())
    }

    /// Process a single received frame and send its outputs.
    pub(super) async fn process_frame(&self, frame: ReceivedFrame) {
        let Some(ingress) = self.ports.get(&frame.port).map(|p| p.class()) else {
            debug!(port = frame.port, "Frame from unknown port, dropping");
            return;
        };

        // Malformed frames are counted and logged by the engine
        let Ok(outputs) = self
            .engine
            .process_bytes(&frame.data, ingress, frame.received_at)
        else {
            return;
        };

        for output in outputs {
            self.send_output(output).await;
        }
    }

    /// Encode an output and send it out its egress port.
    async fn send_output(&self, output: Output) {
        let Some(port_id) = self.forwarding.egress_port(&output) else {
            debug!(
                egress = ?output.egress,
                pdst = %output.packet.physical_dst(),
                header = %output.packet.header,
                "No route for output, dropping"
            );
            return;
        };
        let Some(port) = self.ports.get(&port_id) else {
            debug!(port = port_id, "Egress port not running, dropping");
            return;
        };

        let data = match output.packet.encode() {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, header = %output.packet.header, "Failed to encode output");
                return;
            }
        };

        if let Err(e) = port.send_async(&data).await {
            warn!(port = port_id, error = %e, "Failed to send output");
        }
    }
}
