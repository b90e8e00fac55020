//! Command dispatch and state reconciliation for the HubBridge device bridge.
//!
//! Provides:
//! - Accessory capabilities per transport
//! - Transport selection with LAN → cloud → BLE fallback
//! - A single-flight, interval-paced queue for BLE writes
//! - Inbound status frame routing through caller-supplied handler tables
//! - Echo suppression windows and debouncing for continuous controls
//! - Configuration with environment overrides

pub mod accessory;
pub mod bridge;
pub mod config;
pub mod dispatcher;
pub mod inbound;
pub mod queue;
pub mod router;
pub mod suppression;
pub mod transport;

// Re-exports
pub use accessory::{Accessory, Capabilities, DeviceId, LinkState};

pub use bridge::Bridge;

pub use config::{control_interval, BridgeConfig, ConfigError};

pub use dispatcher::{DispatchError, Dispatcher};

pub use inbound::{InboundError, InboundEvent, InboundReceiver, InboundSender};

pub use queue::{CommandQueue, QueueConfig, QueueError, QueueStats};

pub use router::{process_frames, FunctionCode, HandlerTable, RouteSummary, StatusFrame};

pub use suppression::{Control, DebounceConfig, Debouncer, IgnoreWindows, UpdateToken};

pub use transport::{TransportClient, TransportError, TransportStats};

pub use hubbridge_protocol as protocol;
