//! Transport selection and fallback.
//!
//! Encodes a command, then tries LAN, cloud and BLE in that fixed order,
//! skipping transports the accessory cannot use right now and stopping at
//! the first success. BLE writes go through the [`CommandQueue`].

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, error, trace, warn};

use hubbridge_protocol::{
    encode, AbstractCommand, EncodeError, PayloadSet, TransportKind, TransportPayload,
};

use crate::accessory::Accessory;
use crate::queue::CommandQueue;
use crate::transport::{TransportClient, TransportStats};

/// Dispatch error types.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DispatchError {
    /// Every eligible transport failed, or none was eligible.
    #[error("No connection method available for {device}")]
    NoConnectionMethod { device: String },

    #[error(transparent)]
    InvalidCommand(#[from] EncodeError),
}

/// Routes commands to transport clients.
#[derive(Clone)]
pub struct Dispatcher {
    lan: Option<Arc<dyn TransportClient>>,
    cloud: Option<Arc<dyn TransportClient>>,
    ble: Option<Arc<dyn TransportClient>>,
    queue: Arc<CommandQueue>,
    stats: Arc<DashMap<TransportKind, TransportStats>>,
}

impl Dispatcher {
    /// Create a dispatcher with no clients. BLE writes use `queue`.
    pub fn new(queue: Arc<CommandQueue>) -> Self {
        Self {
            lan: None,
            cloud: None,
            ble: None,
            queue,
            stats: Arc::new(DashMap::new()),
        }
    }

    /// Register a client in the slot of its transport kind.
    pub fn with_client(mut self, client: Arc<dyn TransportClient>) -> Self {
        self.register(client);
        self
    }

    /// Register a client, replacing any client of the same kind.
    pub fn register(&mut self, client: Arc<dyn TransportClient>) {
        let kind = client.kind();
        match kind {
            TransportKind::Lan => self.lan = Some(client),
            TransportKind::Cloud => self.cloud = Some(client),
            TransportKind::Ble => self.ble = Some(client),
        }
        self.stats
            .entry(kind)
            .or_insert_with(|| TransportStats::new(kind));
    }

    /// Client registered for a transport.
    pub fn client(&self, kind: TransportKind) -> Option<&Arc<dyn TransportClient>> {
        match kind {
            TransportKind::Lan => self.lan.as_ref(),
            TransportKind::Cloud => self.cloud.as_ref(),
            TransportKind::Ble => self.ble.as_ref(),
        }
    }

    /// The BLE command queue.
    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Send a command to an accessory over the first transport that takes it.
    ///
    /// Returns the transport that delivered. LAN delivery has no
    /// confirmation; handing the payload to the LAN client counts as success.
    pub async fn send_update(
        &self,
        accessory: &Accessory,
        command: &AbstractCommand,
    ) -> Result<TransportKind, DispatchError> {
        let payloads = encode(command).map_err(|e| {
            error!(device = %accessory.name, "Rejected command {}: {}", command, e);
            DispatchError::from(e)
        })?;

        for kind in [TransportKind::Lan, TransportKind::Cloud] {
            let Some((client, payload)) = self.eligible(accessory, &payloads, kind) else {
                continue;
            };

            match client.update_device(accessory, &payload).await {
                Ok(()) => {
                    self.record(kind, None);
                    debug!(device = %accessory.name, transport = %kind, "Sent {}", command);
                    return Ok(kind);
                }
                Err(e) => {
                    warn!(device = %accessory.name, transport = %kind, "Failed to send {}: {}", command, e);
                    self.record(kind, Some(e.to_string()));
                }
            }
        }

        if let Some((client, payload)) = self.eligible(accessory, &payloads, TransportKind::Ble) {
            let target = accessory.clone();
            let result = self
                .queue
                .submit(async move { client.update_device(&target, &payload).await })
                .await;

            let failure = match result {
                Ok(Ok(())) => {
                    self.record(TransportKind::Ble, None);
                    debug!(device = %accessory.name, transport = "ble", "Sent {}", command);
                    return Ok(TransportKind::Ble);
                }
                Ok(Err(e)) => e.to_string(),
                Err(e) => e.to_string(),
            };
            warn!(device = %accessory.name, transport = "ble", "Failed to send {}: {}", command, failure);
            self.record(TransportKind::Ble, Some(failure));
        }

        warn!(device = %accessory.name, "No connection method for {}", command);
        Err(DispatchError::NoConnectionMethod {
            device: accessory.name.clone(),
        })
    }

    /// Per-transport statistics, in priority order.
    pub fn stats(&self) -> Vec<TransportStats> {
        TransportKind::PRIORITY
            .into_iter()
            .filter_map(|kind| self.stats.get(&kind).map(|s| s.value().clone()))
            .collect()
    }

    fn eligible(
        &self,
        accessory: &Accessory,
        payloads: &PayloadSet,
        kind: TransportKind,
    ) -> Option<(Arc<dyn TransportClient>, TransportPayload)> {
        if !accessory.capabilities.link(kind).is_active() {
            trace!(device = %accessory.name, transport = %kind, "Transport not in use");
            return None;
        }
        let Some(payload) = payloads.get(kind) else {
            trace!(device = %accessory.name, transport = %kind, "No payload for transport");
            return None;
        };
        let Some(client) = self.client(kind) else {
            trace!(device = %accessory.name, transport = %kind, "No client registered");
            return None;
        };
        Some((client.clone(), payload))
    }

    fn record(&self, kind: TransportKind, error: Option<String>) {
        let mut stats = self
            .stats
            .entry(kind)
            .or_insert_with(|| TransportStats::new(kind));
        match error {
            None => stats.record_success(),
            Some(e) => stats.record_failure(e),
        }
    }
}
