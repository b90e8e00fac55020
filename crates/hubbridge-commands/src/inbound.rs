//! Inbound event channel.
//!
//! Transport clients push what they receive onto a bounded channel instead
//! of calling back into device code; the consumer side feeds frame batches
//! to [`crate::router::process_frames`].

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use hubbridge_protocol::TransportKind;

use crate::accessory::{Capabilities, DeviceId};

/// Event delivered from a transport client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum InboundEvent {
    /// Status frames reported by a device.
    Frames {
        /// Device ID
        device_id: DeviceId,
        /// Transport the frames arrived on
        source: TransportKind,
        /// Base64 frames in arrival order
        frames: Vec<String>,
    },
    /// A transport connected or disconnected.
    Connection {
        /// Transport
        transport: TransportKind,
        /// New connection state
        connected: bool,
    },
}

impl InboundEvent {
    /// Mirror a connection event onto an accessory's link states.
    ///
    /// Returns `true` if the event was a connection event. Frame batches
    /// leave `capabilities` untouched; route them with
    /// [`crate::router::process_frames`].
    pub fn apply_connection(&self, capabilities: &mut Capabilities) -> bool {
        match self {
            InboundEvent::Connection {
                transport,
                connected,
            } => {
                capabilities.set_active(*transport, *connected);
                true
            }
            InboundEvent::Frames { .. } => false,
        }
    }
}

/// Inbound channel error types.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum InboundError {
    #[error("Inbound channel is closed")]
    Closed,

    #[error("Inbound channel is full")]
    Full,
}

/// Producer half, cloned into each transport client.
#[derive(Debug, Clone)]
pub struct InboundSender {
    tx: mpsc::Sender<InboundEvent>,
}

impl InboundSender {
    /// Send an event, waiting for room.
    pub async fn send(&self, event: InboundEvent) -> Result<(), InboundError> {
        self.tx.send(event).await.map_err(|_| InboundError::Closed)
    }

    /// Send an event without waiting; a full channel drops the event.
    pub fn try_send(&self, event: InboundEvent) -> Result<(), InboundError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(event) => {
                tracing::warn!(?event, "Inbound channel full, dropping event");
                InboundError::Full
            }
            mpsc::error::TrySendError::Closed(_) => InboundError::Closed,
        })
    }

    /// Report status frames for a device.
    pub async fn frames(
        &self,
        device_id: impl Into<DeviceId>,
        source: TransportKind,
        frames: Vec<String>,
    ) -> Result<(), InboundError> {
        self.send(InboundEvent::Frames {
            device_id: device_id.into(),
            source,
            frames,
        })
        .await
    }

    /// Report a connection state change.
    pub async fn connection(
        &self,
        transport: TransportKind,
        connected: bool,
    ) -> Result<(), InboundError> {
        self.send(InboundEvent::Connection {
            transport,
            connected,
        })
        .await
    }
}

/// Consumer half.
#[derive(Debug)]
pub struct InboundReceiver {
    rx: mpsc::Receiver<InboundEvent>,
}

impl InboundReceiver {
    /// Next event; `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<InboundEvent> {
        self.rx.recv().await
    }
}

/// Create a bounded inbound channel.
pub fn channel(capacity: usize) -> (InboundSender, InboundReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (InboundSender { tx }, InboundReceiver { rx })
}
