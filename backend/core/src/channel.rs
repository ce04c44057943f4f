use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::message::{InboundEvent, OutboundMessage};

/// Default channel buffer size for inter-component messaging.
const DEFAULT_BUFFER_SIZE: usize = 256;

/// The message bus connecting the chat gateway, the conversation engine and
/// the reminder scheduler.
///
/// Gateways push `InboundEvent`s; the engine and scheduler push
/// `OutboundMessage`s which a single delivery loop hands back to the gateway.
/// Built on Tokio mpsc channels for async, bounded backpressure.
pub struct MedBus {
    pub inbound_tx: mpsc::Sender<InboundEvent>,
    pub inbound_rx: Option<mpsc::Receiver<InboundEvent>>,

    pub outbound_tx: mpsc::Sender<OutboundMessage>,
    pub outbound_rx: Option<mpsc::Receiver<OutboundMessage>>,
}

impl MedBus {
    /// Create a new bus with default buffer sizes.
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new bus with a custom buffer size.
    pub fn with_buffer_size(buffer: usize) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(buffer);
        let (outbound_tx, outbound_rx) = mpsc::channel(buffer);

        info!(buffer_size = buffer, "MedBus initialized");

        Self {
            inbound_tx,
            inbound_rx: Some(inbound_rx),
            outbound_tx,
            outbound_rx: Some(outbound_rx),
        }
    }

    /// Take the inbound receiver (can only be called once).
    pub fn take_inbound_rx(&mut self) -> Option<mpsc::Receiver<InboundEvent>> {
        debug!("Inbound receiver taken");
        self.inbound_rx.take()
    }

    /// Take the outbound receiver (can only be called once).
    pub fn take_outbound_rx(&mut self) -> Option<mpsc::Receiver<OutboundMessage>> {
        debug!("Outbound receiver taken");
        self.outbound_rx.take()
    }
}

impl Default for MedBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatId;

    #[tokio::test]
    async fn test_bus_send_receive() {
        let mut bus = MedBus::new();
        let mut rx = bus.take_inbound_rx().unwrap();

        bus.inbound_tx
            .send(InboundEvent::StartCommand { chat_id: ChatId(42) })
            .await
            .unwrap();
        let received = rx.recv().await.unwrap();
        assert_eq!(received.chat_id(), ChatId(42));
    }

    #[tokio::test]
    async fn test_bus_take_rx_once() {
        let mut bus = MedBus::new();
        assert!(bus.take_outbound_rx().is_some());
        assert!(bus.take_outbound_rx().is_none()); // second take is None
    }

    #[tokio::test]
    async fn test_bus_backpressure() {
        let mut bus = MedBus::with_buffer_size(2);
        let _rx = bus.take_outbound_rx().unwrap();

        for _ in 0..2 {
            bus.outbound_tx
                .send(OutboundMessage::text(ChatId(1), "fill"))
                .await
                .unwrap();
        }

        // Third send should not complete immediately (buffer full)
        let result = bus
            .outbound_tx
            .try_send(OutboundMessage::text(ChatId(1), "overflow"));
        assert!(result.is_err());
    }
}
