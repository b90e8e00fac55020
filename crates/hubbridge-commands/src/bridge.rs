//! Bridge core assembly.
//!
//! Wires configuration, the BLE queue, the dispatcher, suppression state and
//! the inbound channel together. Device handlers hold one `Bridge` and use
//! it for every outbound command and every external update check.
//!
//! The consumer of the [`InboundReceiver`] owns the accessories: frame
//! batches go to [`crate::router::process_frames`], connection events are
//! applied with [`crate::inbound::InboundEvent::apply_connection`] so the
//! dispatcher stops choosing a transport that went down.

use std::sync::Arc;

use hubbridge_protocol::{AbstractCommand, TransportKind};

use crate::accessory::Accessory;
use crate::config::{BridgeConfig, ConfigError};
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::inbound::{self, InboundReceiver, InboundSender};
use crate::queue::CommandQueue;
use crate::suppression::{Control, Debouncer, IgnoreWindows};
use crate::transport::TransportClient;

/// The command/state translation core.
pub struct Bridge {
    config: BridgeConfig,
    dispatcher: Dispatcher,
    ignore: IgnoreWindows,
    debouncer: Debouncer,
    inbound: InboundSender,
}

impl Bridge {
    /// Build the core from configuration and transport clients.
    ///
    /// Must be called inside a tokio runtime; the BLE queue worker is
    /// spawned here.
    pub fn new(
        config: BridgeConfig,
        clients: Vec<Arc<dyn TransportClient>>,
    ) -> Result<(Self, InboundReceiver), ConfigError> {
        config.validate()?;

        let queue = Arc::new(CommandQueue::new(config.queue_config()));
        let mut dispatcher = Dispatcher::new(queue);
        for client in clients {
            dispatcher.register(client);
        }

        let (inbound, receiver) = inbound::channel(config.inbound_capacity);

        tracing::info!(
            control_interval = ?config.control_interval(),
            ignore_window = ?config.ignore_window(),
            "Bridge core ready"
        );

        let bridge = Self {
            ignore: IgnoreWindows::new(config.ignore_window()),
            debouncer: Debouncer::new(config.debounce.clone()),
            dispatcher,
            inbound,
            config,
        };
        Ok((bridge, receiver))
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn ignore_windows(&self) -> &IgnoreWindows {
        &self.ignore
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// A sender for transport clients to report inbound events.
    pub fn inbound_sender(&self) -> InboundSender {
        self.inbound.clone()
    }

    /// Send a command immediately.
    pub async fn send_update(
        &self,
        accessory: &Accessory,
        command: &AbstractCommand,
    ) -> Result<TransportKind, DispatchError> {
        self.dispatcher.send_update(accessory, command).await
    }

    /// Send a continuous-control command once it survives its debounce
    /// delay. Returns `None` when a newer request superseded this one.
    pub async fn send_debounced(
        &self,
        accessory: &Accessory,
        control: Control,
        command: &AbstractCommand,
    ) -> Option<Result<TransportKind, DispatchError>> {
        self.debouncer
            .debounce(
                &accessory.device_id,
                control,
                self.dispatcher.send_update(accessory, command),
            )
            .await
    }

    /// Send a command and ignore external updates for the accessory during
    /// the configured window. A failed send closes the window again so the
    /// caller's revert is not suppressed.
    pub async fn send_suppressed(
        &self,
        accessory: &Accessory,
        command: &AbstractCommand,
    ) -> Result<TransportKind, DispatchError> {
        let token = self.ignore.begin(&accessory.device_id);
        let result = self.dispatcher.send_update(accessory, command).await;
        if result.is_err() {
            self.ignore.end(&accessory.device_id, &token);
        }
        result
    }

    /// Whether an externally reported update for the accessory may be applied.
    pub fn accepts_external_update(&self, device_id: &str) -> bool {
        !self.ignore.is_ignoring(device_id)
    }
}
